//! The per-frame tracking loop: detection -> estimator -> direction -> alert.
//!
//! A [`Pipeline`] is owned by a single loop and processes one frame at a time,
//! so the estimator and direction tracker need no locking. The only shared
//! state it touches is the gateway's flag.

use std::fmt;
use std::str::FromStr;

use dropwatch_tracking::{
    BoundingBox, Detector, DirectionEvent, DirectionTracker, Estimator, EstimatorConfig,
    Measurement,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::machine::{AlertMachine, Transition};
use crate::state::AlertState;

/// Which position feed the direction tracker compares.
///
/// The smoothed feed overshoots when a fall stops abruptly: for measured
/// y = 100, 120, 140, 140, 140 the corrected y climbs past 140 and then
/// settles back, so a stationary object reads as `Ascending` for a few frames
/// and clears the alert. The raw feed follows the detector exactly and only
/// reports a reversal when the centroid itself moves up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionSource {
    /// The estimator's corrected position
    #[default]
    Smoothed,
    /// The detector's raw centroid
    Raw,
}

impl fmt::Display for DirectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smoothed => f.write_str("smoothed"),
            Self::Raw => f.write_str("raw"),
        }
    }
}

impl FromStr for DirectionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smoothed" => Ok(Self::Smoothed),
            "raw" => Ok(Self::Raw),
            other => Err(format!("unknown direction source '{other}' (expected smoothed or raw)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineConfig {
    pub estimator: EstimatorConfig,
    pub direction_source: DirectionSource,
}

/// Everything that happened for one processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameOutcome {
    pub measurement: Measurement,
    pub smoothed: Measurement,
    pub look_ahead: Measurement,
    pub event: DirectionEvent,
    pub transition: Transition,
    pub state: AlertState,
}

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub processed: u64,
    pub missed: u64,
    pub rejected: u64,
}

pub struct Pipeline {
    config: PipelineConfig,
    estimator: Estimator,
    direction: DirectionTracker,
    machine: AlertMachine,
    stats: PipelineStats,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig, machine: AlertMachine) -> Self {
        Self {
            config,
            estimator: Estimator::new(config.estimator),
            direction: DirectionTracker::new(),
            machine,
            stats: PipelineStats::default(),
        }
    }

    /// Run `detector` on `frame` and process the result.
    pub fn process_frame<D: Detector>(
        &mut self,
        detector: &mut D,
        frame: &D::Frame,
    ) -> Option<FrameOutcome> {
        let detection = detector.detect(frame);
        self.process_detection(detection)
    }

    /// Process a detector result. `None` is a miss: the frame is skipped.
    pub fn process_detection(&mut self, detection: Option<BoundingBox>) -> Option<FrameOutcome> {
        let Some(bbox) = detection else {
            self.stats.missed += 1;
            debug!("No object detected, frame skipped");
            return None;
        };
        self.process_measurement(bbox.centroid())
    }

    /// Process one centroid. Non-finite measurements are rejected before they
    /// reach the estimator.
    pub fn process_measurement(&mut self, measurement: Measurement) -> Option<FrameOutcome> {
        if !measurement.is_finite() {
            self.stats.rejected += 1;
            warn!(x = measurement.x, y = measurement.y, "Non-finite measurement rejected");
            return None;
        }

        let smoothed = self.estimator.update(measurement);
        let y = match self.config.direction_source {
            DirectionSource::Smoothed => smoothed.y,
            DirectionSource::Raw => measurement.y,
        };
        let event = self.direction.observe(y);
        let transition = self.machine.on_event(event);
        self.stats.processed += 1;

        Some(FrameOutcome {
            measurement,
            smoothed,
            look_ahead: self.estimator.look_ahead(),
            event,
            transition,
            state: self.machine.state(),
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn machine(&self) -> &AlertMachine {
        &self.machine
    }

    /// Forget the current track. The alert state is left alone.
    pub fn reset_track(&mut self) {
        self.estimator.reset();
        self.direction.reset();
    }
}
