use serde::{Deserialize, Serialize};

/// One position measurement as read from a JSONL sample log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionSample {
    pub timestamp: f64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One orientation measurement as read from a JSONL sample log.
/// Quaternion components in (w, x, y, z) order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrientationSample {
    pub timestamp: f64,
    pub qw: f32,
    pub qx: f32,
    pub qy: f32,
    pub qz: f32,
}

/// One filtered position record as written by the replay tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilteredRecord {
    pub timestamp: f64,
    pub estimate: (f32, f32, f32),
    pub prediction: (f32, f32, f32),
    pub velocity: (f32, f32, f32),
}

/// One filtered orientation record as written by the replay tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilteredOrientationRecord {
    pub timestamp: f64,
    pub quaternion: (f32, f32, f32, f32),
    pub euler: (f32, f32, f32),
}
