//! Trigger gateway: the only way to change [`AlertState`].
//!
//! Both the tracking pipeline and external callers (HTTP, CLI) go through
//! [`TriggerGateway::trigger`], so manual and automatic activation share one
//! idempotence guarantee: the read-check-and-flip of the flag and the decision
//! to start a fan-out happen in a single critical section, and exactly one
//! fan-out starts per Idle -> Active edge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dropwatch_notify::{FanOut, FanOutPlan};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::state::{AlertState, StatusSnapshot};

/// Errors building a [`TriggerGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Fan-outs run in the background and need a tokio runtime
    #[error("no tokio runtime available to run alert fan-outs")]
    NoRuntime,
}

/// Result of a [`TriggerGateway::trigger`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerOutcome {
    /// True only for the call that performed the Idle -> Active transition.
    pub activated: bool,
}

#[derive(Debug, Default)]
struct Flag {
    state: AlertState,
    activations: u64,
}

/// Owns the danger flag and starts fan-outs on activation.
pub struct TriggerGateway {
    flag: Mutex<Flag>,
    fan_out: FanOut,
    plan: FanOutPlan,
    tracker: TaskTracker,
    runtime: Handle,
    dispatches: AtomicU64,
}

impl TriggerGateway {
    /// Create a gateway that runs fan-outs on the current tokio runtime.
    pub fn new(fan_out: FanOut, plan: FanOutPlan) -> Result<Self, GatewayError> {
        let runtime = Handle::try_current().map_err(|_| GatewayError::NoRuntime)?;
        Ok(Self::with_runtime(fan_out, plan, runtime))
    }

    /// Create a gateway that runs fan-outs on `runtime`.
    #[must_use]
    pub fn with_runtime(fan_out: FanOut, plan: FanOutPlan, runtime: Handle) -> Self {
        info!(
            transport = fan_out.transport_name(),
            targets = plan.targets.len(),
            rounds = plan.rounds,
            interval_secs = plan.interval.as_secs_f64(),
            "Trigger gateway ready"
        );

        Self {
            flag: Mutex::new(Flag::default()),
            fan_out,
            plan,
            tracker: TaskTracker::new(),
            runtime,
            dispatches: AtomicU64::new(0),
        }
    }

    /// Activate if idle and start a background fan-out.
    ///
    /// Returns `activated: false` without side effects when already active.
    pub fn trigger(&self) -> TriggerOutcome {
        let activation = {
            let mut flag = self.lock();
            if flag.state.is_active() {
                None
            } else {
                flag.state = AlertState::Active;
                flag.activations += 1;
                Some(flag.activations)
            }
        };

        let Some(activation) = activation else {
            debug!("Trigger ignored, alert already active");
            return TriggerOutcome { activated: false };
        };

        info!(activation, "Danger zone activated");
        self.dispatch(activation);

        TriggerOutcome { activated: true }
    }

    /// Current state. Pure read.
    pub fn status(&self) -> AlertState {
        self.lock().state
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let flag = self.lock();
        StatusSnapshot {
            state: flag.state,
            activations: flag.activations,
            dispatches: self.dispatches.load(Ordering::SeqCst),
        }
    }

    /// Force the state back to idle and return what it was.
    ///
    /// Fan-outs already running are not cancelled.
    pub fn reset(&self) -> AlertState {
        let previous = std::mem::take(&mut self.lock().state);
        if previous.is_active() {
            warn!("Danger zone reset by operator");
        } else {
            debug!("Reset requested while idle");
        }
        previous
    }

    /// Active -> Idle transition driven by the tracking pipeline.
    ///
    /// Returns whether the state actually changed.
    pub fn deactivate(&self) -> bool {
        let mut flag = self.lock();
        if flag.state.is_active() {
            flag.state = AlertState::Idle;
            info!("Danger zone cleared");
            true
        } else {
            false
        }
    }

    /// The fan-out plan every activation runs.
    pub fn plan(&self) -> &FanOutPlan {
        &self.plan
    }

    /// Wait for every fan-out started so far to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Fan-outs currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    fn dispatch(&self, activation: u64) {
        self.dispatches.fetch_add(1, Ordering::SeqCst);

        let fan_out = self.fan_out.clone();
        let plan = self.plan.clone();
        self.tracker.spawn_on(
            async move {
                let report = fan_out.run_plan(&plan).await;
                info!(
                    activation,
                    dispatch_id = %report.dispatch_id,
                    attempts = report.attempts(),
                    failed = report.failures(),
                    "Activation fan-out finished"
                );
            },
            &self.runtime,
        );
    }

    fn lock(&self) -> MutexGuard<'_, Flag> {
        // The flag is plain data; a panic elsewhere cannot leave it half-written.
        self.flag.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
