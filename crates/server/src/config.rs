//! Configuration for the Dropwatch service.
//!
//! Everything comes from environment variables (optionally loaded from a
//! `.env` file by the binary). Unset variables fall back to defaults; set but
//! malformed ones are errors rather than silently ignored.

use std::env;
use std::time::Duration;

use dropwatch_alert::DirectionSource;
use dropwatch_notify::{
    ContactTarget, FanOutPlan, InvalidTarget, TwilioConfig, DEFAULT_INTERVAL, DEFAULT_POOL_SIZE,
    DEFAULT_ROUNDS,
};
use dropwatch_tracking::EstimatorConfig;
use thiserror::Error;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Highest `ALERT_PHONE_<n>` index consulted.
const MAX_NUMBERED_PHONES: usize = 9;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("invalid contact target in {key}")]
    Target {
        key: String,
        #[source]
        source: InvalidTarget,
    },
}

/// Dropwatch service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Phone numbers alerted on every activation, deduplicated in order.
    pub targets: Vec<ContactTarget>,
    /// Fan-out rounds per activation (at least 1).
    pub rounds: u32,
    /// Pause between rounds.
    pub interval: Duration,
    /// Concurrent transport calls.
    pub workers: usize,
    /// Twilio credentials; `None` selects the log-only transport.
    pub twilio: Option<TwilioConfig>,
    pub estimator: EstimatorConfig,
    pub direction_source: DirectionSource,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rounds = parse_or(&var, "ALERT_ROUNDS", DEFAULT_ROUNDS)?;
        if rounds == 0 {
            return Err(ConfigError::Invalid {
                key: "ALERT_ROUNDS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let defaults = EstimatorConfig::default();
        let estimator = EstimatorConfig {
            process_noise: parse_or(&var, "ESTIMATOR_PROCESS_NOISE", defaults.process_noise)?,
            measurement_noise: parse_or(
                &var,
                "ESTIMATOR_MEASUREMENT_NOISE",
                defaults.measurement_noise,
            )?,
            ..defaults
        };
        for (key, value) in [
            ("ESTIMATOR_PROCESS_NOISE", estimator.process_noise),
            ("ESTIMATOR_MEASUREMENT_NOISE", estimator.measurement_noise),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    message: "must be a positive number".to_string(),
                });
            }
        }

        Ok(Self {
            port: parse_or(&var, "DROPWATCH_PORT", DEFAULT_PORT)?,
            targets: targets(&var)?,
            rounds,
            interval: Duration::from_secs(parse_or(
                &var,
                "ALERT_INTERVAL_SECS",
                DEFAULT_INTERVAL.as_secs(),
            )?),
            workers: parse_or(&var, "DISPATCH_WORKERS", DEFAULT_POOL_SIZE)?,
            twilio: twilio(&var),
            estimator,
            direction_source: parse_or(&var, "DIRECTION_SOURCE", DirectionSource::default())?,
        })
    }

    /// The plan every activation runs.
    pub fn plan(&self) -> FanOutPlan {
        FanOutPlan::new(self.targets.clone(), self.rounds, self.interval)
    }
}

fn parse_or<V, T>(var: &V, key: &str, default: T) -> Result<T, ConfigError>
where
    V: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// `ALERT_PHONES` first, then `ALERT_PHONE_1..ALERT_PHONE_9`.
fn targets<V>(var: &V) -> Result<Vec<ContactTarget>, ConfigError>
where
    V: Fn(&str) -> Option<String>,
{
    let mut raw: Vec<(String, String)> = var("ALERT_PHONES")
        .map(|list| {
            list.split(',')
                .map(|entry| ("ALERT_PHONES".to_string(), entry.to_string()))
                .collect()
        })
        .unwrap_or_default();

    for index in 1..=MAX_NUMBERED_PHONES {
        let key = format!("ALERT_PHONE_{index}");
        if let Some(value) = var(&key) {
            raw.push((key, value));
        }
    }

    let mut targets: Vec<ContactTarget> = Vec::new();
    for (key, value) in raw {
        if value.trim().is_empty() {
            continue;
        }
        let target =
            ContactTarget::parse(&value).map_err(|source| ConfigError::Target { key, source })?;
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    Ok(targets)
}

/// All three credentials or nothing.
fn twilio<V>(var: &V) -> Option<TwilioConfig>
where
    V: Fn(&str) -> Option<String>,
{
    let config = TwilioConfig::new(
        var("TWILIO_ACCOUNT_SID")?,
        var("TWILIO_AUTH_TOKEN")?,
        var("TWILIO_PHONE_NUMBER")?,
    );
    Some(match var("TWILIO_API_BASE") {
        Some(base) => config.with_api_base(base.trim_end_matches('/')),
        None => config,
    })
}
