//! Alert state machine driven by direction events.
//!
//! | Current | Event                | Next   | Side effect       |
//! |---------|----------------------|--------|-------------------|
//! | Idle    | Descending           | Active | activation        |
//! | Active  | Ascending            | Idle   | deactivation      |
//! | Idle    | Ascending / Unknown  | Idle   | none              |
//! | Active  | Descending / Unknown | Active | none              |
//!
//! The flag itself lives in the [`TriggerGateway`]; the machine only decides
//! which gateway operation an event maps to and drives the local alarm. An
//! alarm started here is silenced by the next upward motion even when the flag
//! was already cleared by an operator reset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dropwatch_tracking::DirectionEvent;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alarm::AlarmIndicator;
use crate::gateway::TriggerGateway;
use crate::state::AlertState;

/// What an event did to the alert state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Idle -> Active, fan-out started
    Activated,
    /// Active -> Idle, alarm silenced
    Deactivated,
    /// No change
    None,
}

pub struct AlertMachine {
    gateway: Arc<TriggerGateway>,
    alarm: Arc<dyn AlarmIndicator>,
    sounding: AtomicBool,
}

impl AlertMachine {
    #[must_use]
    pub fn new(gateway: Arc<TriggerGateway>, alarm: Arc<dyn AlarmIndicator>) -> Self {
        Self {
            gateway,
            alarm,
            sounding: AtomicBool::new(false),
        }
    }

    pub fn on_event(&self, event: DirectionEvent) -> Transition {
        let transition = match event {
            DirectionEvent::Descending => {
                if self.gateway.trigger().activated {
                    self.sounding.store(true, Ordering::SeqCst);
                    self.alarm.start();
                    Transition::Activated
                } else {
                    Transition::None
                }
            }
            DirectionEvent::Ascending => {
                let deactivated = self.gateway.deactivate();
                let was_sounding = self.sounding.swap(false, Ordering::SeqCst);
                if deactivated || was_sounding {
                    self.alarm.stop();
                }
                if deactivated {
                    Transition::Deactivated
                } else {
                    Transition::None
                }
            }
            DirectionEvent::Unknown => Transition::None,
        };

        debug!(event = %event, transition = ?transition, "Alert machine step");
        transition
    }

    pub fn state(&self) -> AlertState {
        self.gateway.status()
    }

    pub fn gateway(&self) -> &Arc<TriggerGateway> {
        &self.gateway
    }
}
