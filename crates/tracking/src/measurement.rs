//! Per-frame measurement types and the detector seam.

use serde::{Deserialize, Serialize};

/// A single centroid observation in screen coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub x: f64,
    pub y: f64,
}

impl Measurement {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite. Non-finite measurements must never reach
    /// the [`crate::Estimator`].
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box as reported by a detector: `(x1, y1)` is the top
/// left corner, `(x2, y2)` the bottom right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Geometric center of the box.
    #[must_use]
    pub fn centroid(&self) -> Measurement {
        Measurement::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Reduces one frame to the bounding box of the tracked object.
///
/// Returning `None` is a detection miss, not an error: the pipeline skips the
/// frame and leaves all tracking state untouched.
pub trait Detector {
    /// Frame representation consumed by this detector.
    type Frame;

    fn detect(&mut self, frame: &Self::Frame) -> Option<BoundingBox>;
}
