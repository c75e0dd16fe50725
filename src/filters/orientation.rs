use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::position::PositionFilter;

/// Snapshot of the filtered orientation state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrientationState {
    /// Smoothed orientation as (w, x, y, z)
    pub quaternion: (f32, f32, f32, f32),

    /// Smoothed Euler triple in unwrapped degrees
    pub euler: (f32, f32, f32),

    /// Number of quaternions folded in since init
    pub updates: u64,
}

/// Orientation filter: runs unwrapped Euler angles through a position filter.
///
/// Incoming quaternions are decomposed into Euler angles (degrees), shifted
/// onto the revolution of the previous sample so the linear filter never sees
/// a ~360° jump at the ±180° wrap boundary, and filtered axis by axis.
/// Filtered output is recomposed into a quaternion.
///
/// The per-axis unwrap is a known-lossy approximation near gimbal lock.
pub struct OrientationFilter {
    filter: PositionFilter,

    /// Last unwrapped Euler triple (degrees), used only to pick the wrap
    /// offset for the next sample
    euler_prev: Vector3<f32>,
}

/// Euler triple (degrees) of the X-Z-Y intrinsic factorization q = Qx·Qz·Qy.
///
/// The needed rotation-matrix entries are built straight from the quaternion
/// components. The Z angle comes from an asin and is limited to ±90°; the X
/// and Y angles get the full atan2 range.
fn quat_to_euler_deg(q: &UnitQuaternion<f32>) -> Vector3<f32> {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    let r00 = 1.0 - 2.0 * (y * y + z * z);
    let r01 = 2.0 * (x * y - w * z);
    let r02 = 2.0 * (x * z + w * y);
    let r11 = 1.0 - 2.0 * (x * x + z * z);
    let r21 = 2.0 * (y * z + w * x);

    let ez = (-r01).clamp(-1.0, 1.0).asin();
    let ex = r21.atan2(r11);
    let ey = r02.atan2(r00);

    Vector3::new(ex.to_degrees(), ey.to_degrees(), ez.to_degrees())
}

/// Recompose a quaternion from an Euler triple (degrees) by rotating about
/// X, then Z, then Y. The order mirrors the factorization above; rotation
/// composition is non-commutative.
fn euler_deg_to_quat(e: Vector3<f32>) -> UnitQuaternion<f32> {
    let qx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), e.x.to_radians());
    let qz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), e.z.to_radians());
    let qy = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), e.y.to_radians());
    qx * qz * qy
}

impl OrientationFilter {
    pub fn new() -> Self {
        Self {
            filter: PositionFilter::new(),
            euler_prev: Vector3::zeros(),
        }
    }

    /// (Re)build the filter. Parameters as on [`PositionFilter::init`].
    pub fn init(&mut self, smoothness: f32, rapidness: f32, use_accel: bool, use_jerk: bool) {
        self.filter.init(smoothness, rapidness, use_accel, use_jerk);
        self.euler_prev = Vector3::zeros();
    }

    /// Feed one orientation sample.
    pub fn update(&mut self, q: &UnitQuaternion<f32>) {
        let mut euler = quat_to_euler_deg(q);

        // Shift each axis onto the revolution of the previous sample, then
        // nudge by a turn when the two samples sit on opposite sides of the
        // ±(90°+rev) band: the unwrapped angle nearest the previous one wins.
        for i in 0..3 {
            let rev = ((self.euler_prev[i] + 180.0) / 360.0).floor() * 360.0;
            euler[i] += rev;
            if euler[i] < -90.0 + rev && self.euler_prev[i] > 90.0 + rev {
                euler[i] += 360.0;
            } else if euler[i] > 90.0 + rev && self.euler_prev[i] < -90.0 + rev {
                euler[i] -= 360.0;
            }
        }

        // The seed must be the unwrapped angle, not the raw decomposition,
        // so it happens here rather than inside the inner update
        if self.filter.first_update() {
            self.filter.seed(euler);
        }

        self.filter.update(euler);
        self.euler_prev = euler;
    }

    /// Advance one time step without a measurement.
    pub fn predict(&mut self) {
        self.filter.predict();
    }

    /// Predicted orientation.
    pub fn get_prediction(&self) -> UnitQuaternion<f32> {
        euler_deg_to_quat(self.filter.get_prediction())
    }

    /// Smoothed orientation.
    pub fn get_estimation(&self) -> UnitQuaternion<f32> {
        euler_deg_to_quat(self.filter.get_estimation())
    }

    /// Snapshot of the current estimate.
    pub fn get_state(&self) -> OrientationState {
        let e = self.filter.get_estimation();
        let q = self.get_estimation();
        OrientationState {
            quaternion: (q.w, q.i, q.j, q.k),
            euler: (e.x, e.y, e.z),
            updates: self.filter.get_state().updates,
        }
    }
}

impl Default for OrientationFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaw_quat(deg: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), deg.to_radians())
    }

    #[test]
    fn test_euler_quat_round_trip() {
        for (ex, ey, ez) in [
            (30.0, 40.0, 20.0),
            (-120.0, 75.0, -45.0),
            (0.0, 179.0, 0.0),
            (10.0, -170.0, 80.0),
        ] {
            let q = euler_deg_to_quat(Vector3::new(ex, ey, ez));
            let e = quat_to_euler_deg(&q);
            assert!(
                (e - Vector3::new(ex, ey, ez)).norm() < 1e-2,
                "({ex},{ey},{ez}) came back as {e:?}"
            );
        }
    }

    #[test]
    fn test_unwrap_across_wrap_boundary() {
        let mut f = OrientationFilter::new();
        let mut prev: Option<f32> = None;
        // Small true rotation whose raw yaw jumps from +179° to −179°
        for deg in [173.0, 175.0, 177.0, 179.0, -179.0, -177.0] {
            f.update(&yaw_quat(deg));
            let unwrapped = f.euler_prev.y;
            if let Some(p) = prev {
                let step = (unwrapped - p).abs();
                assert!(step < 10.0, "unwrapped yaw jumped by {step}°");
            }
            prev = Some(unwrapped);
        }
        // Past the boundary the internal representation keeps counting up
        assert!((f.euler_prev.y - 183.0).abs() < 1e-2);
    }

    #[test]
    fn test_unwrap_accumulates_full_revolutions() {
        let mut f = OrientationFilter::new();
        for deg in [60.0, 150.0, 210.0, 270.0, 330.0, 390.0, 450.0] {
            // Raw yaw wraps into ±180 but the unwrapped track must not
            f.update(&yaw_quat(deg));
        }
        assert!((f.euler_prev.y - 450.0).abs() < 1e-2);
    }

    #[test]
    fn test_first_update_seeds_filter() {
        let mut f = OrientationFilter::new();
        let q = yaw_quat(100.0);
        f.update(&q);
        assert!(f.get_estimation().angle_to(&q) < 1e-3);
    }

    #[test]
    fn test_round_trip_small_rotation() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 20.0_f32.to_radians());
        let mut f = OrientationFilter::new();
        for _ in 0..60 {
            f.update(&q);
        }
        assert!(f.get_estimation().angle_to(&q) < 0.02);
        assert!(f.get_prediction().angle_to(&q) < 0.02);
    }

    #[test]
    fn test_accessors_before_update_are_identity() {
        let f = OrientationFilter::new();
        assert!(f.get_estimation().angle_to(&UnitQuaternion::identity()) < 1e-6);
    }

    #[test]
    fn test_state_snapshot_matches_estimation() {
        let mut f = OrientationFilter::new();
        for deg in [10.0, 12.0, 14.0] {
            f.update(&yaw_quat(deg));
        }
        let state = f.get_state();
        assert_eq!(state.updates, 3);
        let q = f.get_estimation();
        assert!((state.quaternion.0 - q.w).abs() < 1e-6);
        assert!((state.quaternion.2 - q.j).abs() < 1e-6);
    }
}
