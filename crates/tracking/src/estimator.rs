//! Constant-velocity Kalman filter over the tracked centroid.
//!
//! State vector: `[x, y, vx, vy]` (pixels and pixels/frame).
//! Measurement:  `[x, y]`, velocity is never observed directly.
//!
//! Every [`Estimator::update`] corrects the previously predicted state with the
//! new measurement and then predicts one frame ahead. The corrected position is
//! what the pipeline consumes; the prediction is kept as the look-ahead.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::measurement::Measurement;

/// Default process noise variance (Q = q * I).
const DEFAULT_PROCESS_NOISE: f64 = 1.0;
/// Default measurement noise variance (R = r * I).
const DEFAULT_MEASUREMENT_NOISE: f64 = 1.0;
/// Default prior variance. Large so the first measurement dominates the zero
/// initial state.
const DEFAULT_INITIAL_UNCERTAINTY: f64 = 1000.0;

/// Noise tuning for the [`Estimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// How much the object may deviate from constant velocity per frame.
    pub process_noise: f64,
    /// How noisy the detector's centroids are.
    pub measurement_noise: f64,
    /// Variance of the zero initial state.
    pub initial_uncertainty: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            initial_uncertainty: DEFAULT_INITIAL_UNCERTAINTY,
        }
    }
}

/// Snapshot of the corrected track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl TrackState {
    #[must_use]
    pub const fn position(&self) -> Measurement {
        Measurement::new(self.x, self.y)
    }
}

/// Smooths noisy centroids into a position and velocity estimate.
///
/// Owned by exactly one tracking loop; it is not meant to be shared.
#[derive(Debug, Clone)]
pub struct Estimator {
    config: EstimatorConfig,
    /// State predicted for the next frame.
    predicted: Vector4<f64>,
    /// State after the most recent correction.
    corrected: Vector4<f64>,
    /// Covariance of `predicted`.
    p: Matrix4<f64>,
    f: Matrix4<f64>,
    h: Matrix2x4<f64>,
    q: Matrix4<f64>,
    r: Matrix2<f64>,
    updates: u64,
}

impl Estimator {
    #[must_use]
    pub fn new(config: EstimatorConfig) -> Self {
        // x_{k+1} = F * x_k
        #[rustfmt::skip]
        let f = Matrix4::new(
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let h = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            config,
            predicted: Vector4::zeros(),
            corrected: Vector4::zeros(),
            p: Matrix4::identity() * config.initial_uncertainty,
            f,
            h,
            q: Matrix4::identity() * config.process_noise,
            r: Matrix2::identity() * config.measurement_noise,
            updates: 0,
        }
    }

    /// Feed one measurement and return the corrected (smoothed) position.
    ///
    /// The caller guarantees `measurement` is finite.
    pub fn update(&mut self, measurement: Measurement) -> Measurement {
        debug_assert!(measurement.is_finite(), "non-finite measurement");

        self.correct(measurement);
        self.predict();
        self.updates += 1;

        trace!(
            x = self.corrected[0],
            y = self.corrected[1],
            vx = self.corrected[2],
            vy = self.corrected[3],
            "estimator updated"
        );

        self.state().position()
    }

    /// One-step-ahead position: where the object is expected on the next frame.
    #[must_use]
    pub fn look_ahead(&self) -> Measurement {
        Measurement::new(self.predicted[0], self.predicted[1])
    }

    /// Corrected position and velocity. All zero before the first update.
    #[must_use]
    pub fn state(&self) -> TrackState {
        TrackState {
            x: self.corrected[0],
            y: self.corrected[1],
            vx: self.corrected[2],
            vy: self.corrected[3],
        }
    }

    /// Total variance of the predicted state (trace of the covariance).
    #[must_use]
    pub fn uncertainty(&self) -> f64 {
        self.p.trace()
    }

    /// Number of measurements absorbed so far.
    #[must_use]
    pub const fn updates(&self) -> u64 {
        self.updates
    }

    #[must_use]
    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Forget the track and return to the initial state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    fn correct(&mut self, measurement: Measurement) {
        let z = Vector2::new(measurement.x, measurement.y);
        let innovation = z - self.h * self.predicted;
        let s = self.h * self.p * self.h.transpose() + self.r;

        let Some(s_inv) = s.try_inverse() else {
            // Singular innovation covariance only happens with zero noise on
            // both sides; keep the prediction as the estimate.
            self.corrected = self.predicted;
            return;
        };

        let k: Matrix4x2<f64> = self.p * self.h.transpose() * s_inv;
        self.corrected = self.predicted + k * innovation;
        self.p = (Matrix4::identity() - k * self.h) * self.p;
    }

    fn predict(&mut self) {
        self.predicted = self.f * self.corrected;
        self.p = self.f * self.p * self.f.transpose() + self.q;
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}
