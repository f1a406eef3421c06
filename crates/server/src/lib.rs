//! Dropwatch service assembly.
//!
//! This crate provides:
//! - Environment configuration
//! - HTTP surface for the trigger gateway
//! - Offline trajectory replay through the tracking pipeline

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod replay;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use dropwatch_alert::TriggerGateway;
use dropwatch_notify::{DispatchPool, FanOut, LogTransport, Transport, TwilioTransport};
use tracing::{info, warn};

pub use config::{Config, ConfigError};
pub use server::{build_router, run_server, AppState};

/// Pick the notification transport: Twilio when credentials are present,
/// otherwise log-only.
pub fn build_transport(config: &Config) -> Result<Arc<dyn Transport>> {
    if let Some(twilio) = &config.twilio {
        let transport =
            TwilioTransport::new(twilio.clone()).context("Failed to create Twilio transport")?;
        info!(api_base = %twilio.api_base, "Twilio transport configured");
        Ok(Arc::new(transport))
    } else {
        warn!("No Twilio credentials configured - alerts will only be logged");
        Ok(Arc::new(LogTransport))
    }
}

/// Build the gateway on the current tokio runtime.
pub fn build_gateway(config: &Config) -> Result<Arc<TriggerGateway>> {
    if config.targets.is_empty() {
        warn!("No alert targets configured - activations will not notify anyone");
    }

    let fan_out = FanOut::new(build_transport(config)?, DispatchPool::new(config.workers));
    let gateway =
        TriggerGateway::new(fan_out, config.plan()).context("Failed to create trigger gateway")?;
    Ok(Arc::new(gateway))
}
