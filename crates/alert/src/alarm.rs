//! Local alarm indication (the siren next to the camera).

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

/// A continuous local alarm started on activation and silenced when the
/// danger clears. Silencing never recalls notifications already sent.
#[cfg_attr(test, mockall::automock)]
pub trait AlarmIndicator: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Alarm that only logs its state changes.
#[derive(Debug, Default)]
pub struct LogAlarm {
    sounding: AtomicBool,
}

impl LogAlarm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding.load(Ordering::SeqCst)
    }
}

impl AlarmIndicator for LogAlarm {
    fn start(&self) {
        if !self.sounding.swap(true, Ordering::SeqCst) {
            warn!("\u{1f6a8} Siren on");
        }
    }

    fn stop(&self) {
        if self.sounding.swap(false, Ordering::SeqCst) {
            info!("Siren off");
        }
    }
}
