//! Vertical direction classification.
//!
//! Screen coordinates are assumed, so a growing y means the object is moving
//! toward the bottom of the frame (descending). There is no hysteresis band:
//! every reversal flips the event on the very next observation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of vertical motion between two consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionEvent {
    /// Moving up the frame (y decreasing)
    Ascending,
    /// Moving down the frame (y increasing)
    Descending,
    /// No movement observed yet
    Unknown,
}

impl DirectionEvent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DirectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remembers the previous y value and compares each new one against it.
#[derive(Debug, Clone)]
pub struct DirectionTracker {
    previous: Option<f64>,
    last_event: DirectionEvent,
}

impl DirectionTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous: None,
            last_event: DirectionEvent::Unknown,
        }
    }

    /// Classify `y` against the previous observation and store it.
    ///
    /// An unchanged y repeats the previous event.
    pub fn observe(&mut self, y: f64) -> DirectionEvent {
        let event = match self.previous {
            None => DirectionEvent::Unknown,
            Some(prev) if y > prev => DirectionEvent::Descending,
            Some(prev) if y < prev => DirectionEvent::Ascending,
            Some(_) => self.last_event,
        };

        self.previous = Some(y);
        self.last_event = event;
        event
    }

    #[must_use]
    pub const fn previous(&self) -> Option<f64> {
        self.previous
    }

    #[must_use]
    pub const fn last_event(&self) -> DirectionEvent {
        self.last_event
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for DirectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
