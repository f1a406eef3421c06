//! Danger detection and alert triggering for Dropwatch.
//!
//! - [`TriggerGateway`] owns the [`AlertState`] flag and starts one fan-out per
//!   activation, whether the trigger came from the pipeline or from outside
//! - [`AlertMachine`] maps direction events onto gateway transitions and the
//!   local alarm
//! - [`Pipeline`] is the per-frame tracking loop feeding the machine

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alarm;
pub mod gateway;
pub mod machine;
pub mod pipeline;
pub mod state;

pub use alarm::{AlarmIndicator, LogAlarm};
pub use gateway::{GatewayError, TriggerGateway, TriggerOutcome};
pub use machine::{AlertMachine, Transition};
pub use pipeline::{DirectionSource, FrameOutcome, Pipeline, PipelineConfig, PipelineStats};
pub use state::{AlertState, StatusSnapshot};
