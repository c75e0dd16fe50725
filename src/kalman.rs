use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Linear discrete Kalman filter over ndarray storage.
///
/// Implements the textbook recursion
///   predict:  x⁻ = F·x⁺,  P⁻ = F·P⁺·Fᵀ + Q
///   correct:  K = P⁻·Hᵀ·(H·P⁻·Hᵀ + R)⁻¹,  x⁺ = x⁻ + K·(z − H·x⁻),
///             P⁺ = (I − K·H)·P⁻
///
/// `predict()` copies the predicted state back into the posterior, so calling
/// it repeatedly without a correction keeps advancing the state one step per
/// call (open-loop extrapolation).
pub struct KalmanFilter {
    /// Predicted state x⁻ [state_dim]
    pub(crate) state_pre: Array1<f32>,
    /// Corrected state x⁺ [state_dim]
    pub(crate) state_post: Array1<f32>,
    /// State transition F [state_dim × state_dim]
    pub(crate) transition: Array2<f32>,
    /// Measurement operator H [meas_dim × state_dim]
    pub(crate) measurement: Array2<f32>,
    /// Process noise Q [state_dim × state_dim]
    pub(crate) process_noise: Array2<f32>,
    /// Measurement noise R [meas_dim × meas_dim]
    pub(crate) measurement_noise: Array2<f32>,
    /// Predicted covariance P⁻
    error_cov_pre: Array2<f32>,
    /// Corrected covariance P⁺
    pub(crate) error_cov_post: Array2<f32>,
}

impl KalmanFilter {
    /// Create a filter with all matrices zeroed except an identity transition.
    pub fn new(state_dim: usize, meas_dim: usize) -> Self {
        Self {
            state_pre: Array1::zeros(state_dim),
            state_post: Array1::zeros(state_dim),
            transition: Array2::eye(state_dim),
            measurement: Array2::zeros((meas_dim, state_dim)),
            process_noise: Array2::zeros((state_dim, state_dim)),
            measurement_noise: Array2::zeros((meas_dim, meas_dim)),
            error_cov_pre: Array2::zeros((state_dim, state_dim)),
            error_cov_post: Array2::zeros((state_dim, state_dim)),
        }
    }

    pub fn state_dim(&self) -> usize {
        self.state_pre.len()
    }

    /// Advance one time step under the transition model, no measurement.
    ///
    /// Returns the predicted state. The posterior is overwritten with the
    /// prediction so that consecutive calls keep extrapolating.
    pub fn predict(&mut self) -> Array1<f32> {
        // x⁻ = F·x⁺
        self.state_pre = self.transition.dot(&self.state_post);

        // P⁻ = F·P⁺·Fᵀ + Q
        let fp = self.transition.dot(&self.error_cov_post);
        self.error_cov_pre = fp.dot(&self.transition.t()) + &self.process_noise;

        self.state_post.assign(&self.state_pre);
        self.error_cov_post.assign(&self.error_cov_pre);

        self.state_pre.clone()
    }

    /// Fold in a measurement, producing the corrected state.
    ///
    /// A singular innovation covariance (reachable only through degenerate
    /// caller-supplied noise scales) skips the correction and returns the
    /// prediction unchanged.
    pub fn correct(&mut self, measurement: &Array1<f32>) -> Array1<f32> {
        let n = self.state_dim();
        let m = measurement.len();

        // S = H·P⁻·Hᵀ + R
        let ph_t = self.error_cov_pre.dot(&self.measurement.t());
        let s = self.measurement.dot(&ph_t) + &self.measurement_noise;

        let s_na = DMatrix::from_fn(m, m, |i, j| s[[i, j]]);
        let s_inv_na = match s_na.try_inverse() {
            Some(inv) => inv,
            None => {
                self.state_post.assign(&self.state_pre);
                return self.state_post.clone();
            }
        };
        let s_inv = Array2::from_shape_fn((m, m), |(i, j)| s_inv_na[(i, j)]);

        // K = P⁻·Hᵀ·S⁻¹
        let gain = ph_t.dot(&s_inv);

        // x⁺ = x⁻ + K·(z − H·x⁻)
        let innovation = measurement - &self.measurement.dot(&self.state_pre);
        self.state_post = &self.state_pre + &gain.dot(&innovation);

        // P⁺ = (I − K·H)·P⁻
        let kh = gain.dot(&self.measurement);
        let i_kh = Array2::<f32>::eye(n) - kh;
        self.error_cov_post = i_kh.dot(&self.error_cov_pre);

        self.state_post.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    /// 1-state filter: x tracks a scalar directly.
    fn scalar_filter(q: f32, r: f32) -> KalmanFilter {
        let mut kf = KalmanFilter::new(1, 1);
        kf.measurement[[0, 0]] = 1.0;
        kf.process_noise[[0, 0]] = q;
        kf.measurement_noise[[0, 0]] = r;
        kf.error_cov_post[[0, 0]] = 0.1;
        kf
    }

    #[test]
    fn test_gain_pulls_estimate_toward_measurement() {
        let mut kf = scalar_filter(0.1, 0.1);
        kf.state_post[0] = 0.0;

        let prediction = kf.predict()[0];
        let estimate = kf.correct(&arr1(&[1.0]))[0];

        // Estimate must land strictly between prediction and measurement
        assert!(estimate > prediction);
        assert!(estimate < 1.0);
    }

    #[test]
    fn test_repeated_predict_extrapolates() {
        // 2-state constant velocity: [pos, vel]
        let mut kf = KalmanFilter::new(2, 1);
        kf.transition[[0, 1]] = 1.0;
        kf.measurement[[0, 0]] = 1.0;
        kf.state_post[0] = 1.0;
        kf.state_post[1] = 0.5;

        let p1 = kf.predict()[0];
        let p2 = kf.predict()[0];
        assert!((p1 - 1.5).abs() < 1e-6);
        assert!((p2 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_singular_innovation_skips_correction() {
        // Zero H, zero R, zero P: S is exactly singular
        let mut kf = KalmanFilter::new(1, 1);
        kf.state_post[0] = 3.0;

        let prediction = kf.predict()[0];
        let estimate = kf.correct(&arr1(&[10.0]))[0];
        assert_eq!(prediction, estimate);
    }

    #[test]
    fn test_covariance_shrinks_on_correct() {
        let mut kf = scalar_filter(0.01, 0.5);
        kf.predict();
        let p_before = kf.error_cov_post[[0, 0]];
        kf.correct(&arr1(&[0.0]));
        let p_after = kf.error_cov_post[[0, 0]];
        assert!(p_after < p_before);
    }
}
