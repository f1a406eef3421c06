//! Alert fan-out for Dropwatch.
//!
//! This crate delivers danger alerts to a fixed set of phone numbers by voice
//! call and SMS, repeating the whole sweep for a number of rounds.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dropwatch_notify::{ContactTarget, DispatchPool, FanOut, LogTransport};
//!
//! # async fn example() {
//! let fan_out = FanOut::new(Arc::new(LogTransport), DispatchPool::default());
//! let targets = vec![ContactTarget::parse("+15550100001").unwrap()];
//!
//! let report = fan_out.run(&targets, 5, Duration::from_secs(30)).await;
//! assert_eq!(report.attempts(), 10);
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`Transport`] trait defines the voice/SMS provider interface
//! - [`TwilioTransport`] implements it over the Twilio REST API
//! - [`LogTransport`] only logs, for running without a provider
//! - [`DispatchPool`] bounds how many provider calls run at once
//! - [`FanOut`] runs the rounds and isolates failures per (target, channel)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod contact;
pub mod error;
pub mod fanout;
pub mod pool;

pub use channels::log_only::LogTransport;
pub use channels::twilio::{TwilioConfig, TwilioTransport};
pub use channels::{Receipt, Transport};
pub use contact::{Channel, ContactTarget};
pub use error::{ChannelError, InvalidTarget, PoolError};
pub use fanout::{
    AttemptOutcome, AttemptStatus, FanOut, FanOutPlan, FanOutReport, RoundReport, DEFAULT_INTERVAL,
    DEFAULT_ROUNDS,
};
pub use pool::{DispatchPool, DEFAULT_POOL_SIZE};
