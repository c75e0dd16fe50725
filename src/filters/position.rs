use nalgebra::{Matrix3, Vector3};
use ndarray::{arr1, Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::kalman::KalmanFilter;

/// Couplings running up the kinematic chain, one/two/three blocks above the
/// diagonal: velocity feeds position with weight 1, acceleration with 0.5,
/// jerk with 0.25. One implicit unit time step per call.
const COUPLING: [f32; 3] = [1.0, 0.5, 0.25];

/// Snapshot of the filtered position state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionState {
    /// Smoothed position from the latest correction
    pub position: (f32, f32, f32),

    /// Velocity estimate from the latest correction
    pub velocity: (f32, f32, f32),

    /// Number of measurements folded in since init
    pub updates: u64,
}

/// Kalman filter tracking a 3-D position under a constant-velocity,
/// constant-acceleration or constant-jerk model.
///
/// State vector layout (by kinematic quantity, not by axis):
/// [0-2]:  position (x, y, z)
/// [3-5]:  velocity
/// [6-8]:  acceleration (9- and 12-state models)
/// [9-11]: jerk (12-state model)
///
/// Measurements are always the 3 position components.
pub struct PositionFilter {
    kf: KalmanFilter,

    /// Cached output of the most recent predict
    prediction: Array1<f32>,

    /// Cached output of the most recent correct
    estimate: Array1<f32>,

    /// True until the first measurement arrives
    first_update: bool,

    updates: u64,
}

/// Block-structured integrator matrix for a dim/3-deep kinematic chain.
fn transition_matrix(dim: usize) -> Array2<f32> {
    let mut f = Array2::<f32>::eye(dim);
    for i in 0..dim {
        for (m, &c) in COUPLING.iter().enumerate() {
            let j = i + 3 * (m + 1);
            if j < dim {
                f[[i, j]] = c;
            }
        }
    }
    f
}

impl PositionFilter {
    /// Velocity-only filter with the default smoothness/rapidness of 0.1.
    pub fn new() -> Self {
        let mut filter = Self {
            kf: KalmanFilter::new(6, 3),
            prediction: Array1::zeros(6),
            estimate: Array1::zeros(6),
            first_update: true,
            updates: 0,
        };
        filter.init(0.1, 0.1, false, false);
        filter
    }

    /// (Re)build the filter.
    ///
    /// `smoothness` scales the process noise (smaller is smoother),
    /// `rapidness` scales the measurement noise (smaller trusts measurements
    /// more). `use_accel` extends the state with acceleration; `use_jerk`
    /// extends it further with jerk but only takes effect when `use_accel` is
    /// also set. Noise scales are taken as-is, zero and negative included.
    pub fn init(&mut self, smoothness: f32, rapidness: f32, use_accel: bool, use_jerk: bool) {
        let dim = if use_jerk && use_accel {
            12
        } else if use_accel {
            9
        } else {
            6
        };

        let mut kf = KalmanFilter::new(dim, 3);
        kf.transition = transition_matrix(dim);

        // H extracts the position slots
        for i in 0..3 {
            kf.measurement[[i, i]] = 1.0;
            kf.measurement_noise[[i, i]] = rapidness;
        }
        for i in 0..dim {
            kf.process_noise[[i, i]] = smoothness;
            kf.error_cov_post[[i, i]] = 0.1;
        }

        self.kf = kf;
        self.prediction = Array1::zeros(dim);
        self.estimate = Array1::zeros(dim);
        self.first_update = true;
        self.updates = 0;
    }

    /// Feed one position measurement: predict, then correct.
    pub fn update(&mut self, p: Vector3<f32>) {
        if self.first_update {
            self.seed(p);
        }

        self.prediction = self.kf.predict();
        self.estimate = self.kf.correct(&arr1(&[p.x, p.y, p.z]));
        self.updates += 1;
    }

    /// Advance one time step without a measurement, refreshing the cached
    /// prediction. Open-loop extrapolation between samples.
    pub fn predict(&mut self) {
        self.prediction = self.kf.predict();
    }

    /// Whether the next update is the first since init.
    pub(crate) fn first_update(&self) -> bool {
        self.first_update
    }

    /// Write a value straight into the pre/post position slots so the first
    /// predict does not extrapolate from a zero state toward a far-away
    /// measurement. Clears the first-update flag.
    pub(crate) fn seed(&mut self, p: Vector3<f32>) {
        self.first_update = false;
        for (i, v) in [p.x, p.y, p.z].into_iter().enumerate() {
            self.kf.state_pre[i] = v;
            self.kf.state_post[i] = v;
        }
    }

    /// Predicted position.
    pub fn get_prediction(&self) -> Vector3<f32> {
        Vector3::new(self.prediction[0], self.prediction[1], self.prediction[2])
    }

    /// Predicted position, velocity and acceleration as the rows of a 3×3
    /// matrix. Rows beyond the configured model order read as zeros (the
    /// acceleration row is only populated by the 9- and 12-state models).
    pub fn get_prediction_all(&self) -> Matrix3<f32> {
        let slot = |i: usize| {
            if i < self.prediction.len() {
                self.prediction[i]
            } else {
                0.0
            }
        };
        Matrix3::new(
            slot(0),
            slot(1),
            slot(2),
            slot(3),
            slot(4),
            slot(5),
            slot(6),
            slot(7),
            slot(8),
        )
    }

    /// Smoothed position.
    pub fn get_estimation(&self) -> Vector3<f32> {
        Vector3::new(self.estimate[0], self.estimate[1], self.estimate[2])
    }

    /// Velocity estimate.
    pub fn get_velocity(&self) -> Vector3<f32> {
        Vector3::new(self.estimate[3], self.estimate[4], self.estimate[5])
    }

    /// Snapshot of the current estimate.
    pub fn get_state(&self) -> PositionState {
        let p = self.get_estimation();
        let v = self.get_velocity();
        PositionState {
            position: (p.x, p.y, p.z),
            velocity: (v.x, v.y, v.z),
            updates: self.updates,
        }
    }
}

impl Default for PositionFilter {
    fn default() -> Self {
        Self::new()
    }
}
