//! Pose smoothing filters.
//!
//! Estimates a moving point's position (and, through a second layer, its
//! orientation) from noisy discrete-time samples using a linear Kalman filter
//! with a selectable kinematic order: constant velocity, constant
//! acceleration, or constant jerk. Each `update()` runs one predict/correct
//! cycle; `predict()` alone extrapolates between samples.
//!
//! ```no_run
//! use nalgebra::Vector3;
//! use pose_filter_rs::PositionFilter;
//!
//! let mut filter = PositionFilter::new();
//! filter.init(0.1, 0.1, true, false);
//! filter.update(Vector3::new(1.0, 2.0, 3.0));
//! let smoothed = filter.get_estimation();
//! let velocity = filter.get_velocity();
//! ```

pub mod filters;
pub mod kalman;
pub mod types;

pub use filters::orientation::{OrientationFilter, OrientationState};
pub use filters::position::{PositionFilter, PositionState};
pub use kalman::KalmanFilter;
