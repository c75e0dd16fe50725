pub mod orientation;
pub mod position;

pub use orientation::{OrientationFilter, OrientationState};
pub use position::{PositionFilter, PositionState};
