//! Trajectory tracking for the Dropwatch pipeline.
//!
//! This crate holds the pure, synchronous half of the pipeline:
//!
//! - [`Estimator`] smooths per-frame centroids with a constant-velocity
//!   Kalman filter
//! - [`DirectionTracker`] classifies successive vertical positions as
//!   ascending or descending
//! - [`Detector`] is the seam where a frame-to-bounding-box detector plugs in
//!
//! Nothing here performs I/O or needs an async runtime, so the whole crate can
//! be driven by tests feeding synthetic measurement sequences.

pub mod direction;
pub mod estimator;
pub mod measurement;

pub use direction::{DirectionEvent, DirectionTracker};
pub use estimator::{Estimator, EstimatorConfig, TrackState};
pub use measurement::{BoundingBox, Detector, Measurement};
