//! Multi-round alert fan-out.
//!
//! A fan-out runs a fixed number of rounds. In each round every target gets a
//! voice call and an SMS, all started together on the [`DispatchPool`]. The
//! next round starts only after every attempt of the current one has finished
//! (successfully or not), followed by the inter-round pause.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::channels::Transport;
use crate::contact::{Channel, ContactTarget};
use crate::error::ChannelError;
use crate::pool::DispatchPool;

/// Default number of rounds per fan-out.
pub const DEFAULT_ROUNDS: u32 = 5;

/// Default pause between rounds.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// What a fan-out sends and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutPlan {
    pub targets: Vec<ContactTarget>,
    pub rounds: u32,
    pub interval: Duration,
}

impl FanOutPlan {
    #[must_use]
    pub fn new(targets: Vec<ContactTarget>, rounds: u32, interval: Duration) -> Self {
        Self {
            targets,
            rounds,
            interval,
        }
    }

    /// Channel attempts a complete run of this plan makes.
    #[must_use]
    pub fn total_attempts(&self) -> usize {
        self.rounds as usize * self.targets.len() * Channel::ALL.len()
    }
}

impl Default for FanOutPlan {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_ROUNDS, DEFAULT_INTERVAL)
    }
}

/// Result of one channel attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    Delivered { reference: String },
    Failed { error: String },
}

/// Outcome of one (target, channel) pair in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub target: ContactTarget,
    pub channel: Channel,
    #[serde(flatten)]
    pub status: AttemptStatus,
}

impl AttemptOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, AttemptStatus::Delivered { .. })
    }
}

/// All attempts of one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    /// 1-based round ordinal.
    pub round: u32,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<AttemptOutcome>,
}

impl RoundReport {
    #[must_use]
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }
}

/// Everything a fan-out did, for logging and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutReport {
    pub dispatch_id: Uuid,
    pub rounds: Vec<RoundReport>,
}

impl FanOutReport {
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.rounds.iter().map(|r| r.outcomes.len()).sum()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.rounds.iter().map(RoundReport::failures).sum()
    }

    /// Every outcome for `target` on `channel`, across rounds.
    pub fn outcomes_for<'a>(
        &'a self,
        target: &'a ContactTarget,
        channel: Channel,
    ) -> impl Iterator<Item = &'a AttemptOutcome> + 'a {
        self.rounds
            .iter()
            .flat_map(|r| r.outcomes.iter())
            .filter(move |o| &o.target == target && o.channel == channel)
    }
}

/// Runs fan-outs against one transport.
#[derive(Clone)]
pub struct FanOut {
    transport: Arc<dyn Transport>,
    pool: DispatchPool,
}

impl FanOut {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, pool: DispatchPool) -> Self {
        Self { transport, pool }
    }

    #[must_use]
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Run a complete fan-out described by `plan`.
    pub async fn run_plan(&self, plan: &FanOutPlan) -> FanOutReport {
        self.run(&plan.targets, plan.rounds, plan.interval).await
    }

    /// Run `rounds` sequential rounds over `targets`, pausing `interval`
    /// between rounds.
    ///
    /// Never fails: channel errors are logged and recorded in the report.
    pub async fn run(
        &self,
        targets: &[ContactTarget],
        rounds: u32,
        interval: Duration,
    ) -> FanOutReport {
        let dispatch_id = Uuid::new_v4();

        info!(
            %dispatch_id,
            transport = self.transport.name(),
            targets = targets.len(),
            rounds,
            interval_secs = interval.as_secs_f64(),
            "Starting alert fan-out"
        );

        if targets.is_empty() {
            warn!(%dispatch_id, "No contact targets configured, rounds will be empty");
        }

        let mut reports = Vec::with_capacity(rounds as usize);
        for round in 1..=rounds {
            let report = self.run_round(dispatch_id, round, rounds, targets).await;

            info!(
                %dispatch_id,
                round,
                rounds,
                delivered = report.successes(),
                failed = report.failures(),
                "Alert round complete"
            );
            reports.push(report);

            if round < rounds {
                info!(
                    %dispatch_id,
                    wait_secs = interval.as_secs_f64(),
                    "Waiting before next round"
                );
                tokio::time::sleep(interval).await;
            }
        }

        let report = FanOutReport {
            dispatch_id,
            rounds: reports,
        };

        info!(
            %dispatch_id,
            attempts = report.attempts(),
            failed = report.failures(),
            "Alert fan-out completed"
        );

        report
    }

    async fn run_round(
        &self,
        dispatch_id: Uuid,
        round: u32,
        rounds: u32,
        targets: &[ContactTarget],
    ) -> RoundReport {
        let started_at = Utc::now();
        info!(%dispatch_id, round, rounds, "Alert round started");

        let attempts = targets.iter().flat_map(|target| {
            Channel::ALL
                .into_iter()
                .map(move |channel| self.attempt(dispatch_id, round, target.clone(), channel))
        });

        RoundReport {
            round,
            started_at,
            outcomes: join_all(attempts).await,
        }
    }

    async fn attempt(
        &self,
        dispatch_id: Uuid,
        round: u32,
        target: ContactTarget,
        channel: Channel,
    ) -> AttemptOutcome {
        let transport = Arc::clone(&self.transport);
        let task_target = target.clone();
        let result = self
            .pool
            .submit(async move { transport.send(channel, &task_target).await })
            .await;

        let status = match result {
            Ok(Ok(receipt)) => AttemptStatus::Delivered {
                reference: receipt.reference,
            },
            Ok(Err(e)) => AttemptStatus::Failed {
                error: e.to_string(),
            },
            Err(e) => AttemptStatus::Failed {
                error: ChannelError::from(e).to_string(),
            },
        };

        if let AttemptStatus::Failed { error } = &status {
            error!(
                %dispatch_id,
                round,
                channel = %channel,
                target = %target.redacted(),
                error = %error,
                "Alert attempt failed"
            );
        }

        AttemptOutcome {
            target,
            channel,
            status,
        }
    }
}
