//! Voice/SMS transport implementations.

pub mod log_only;
pub mod twilio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::contact::{Channel, ContactTarget};
use crate::error::ChannelError;

/// Provider acknowledgement for one delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Provider-side identifier (call or message SID).
    pub reference: String,
}

impl Receipt {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// Trait for notification transports (Twilio, log-only, etc.).
///
/// Each method is one channel attempt for one target. Failures are reported as
/// a single [`ChannelError`]; transports do not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get the name of this transport.
    fn name(&self) -> &'static str;

    /// Place a voice call to `target`.
    async fn call(&self, target: &ContactTarget) -> Result<Receipt, ChannelError>;

    /// Send a text message to `target`.
    async fn sms(&self, target: &ContactTarget) -> Result<Receipt, ChannelError>;

    /// Dispatch on `channel`.
    async fn send(
        &self,
        channel: Channel,
        target: &ContactTarget,
    ) -> Result<Receipt, ChannelError> {
        match channel {
            Channel::Call => self.call(target).await,
            Channel::Sms => self.sms(target).await,
        }
    }
}
