//! Log-only transport, used when no provider is configured.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{Receipt, Transport};
use crate::contact::{Channel, ContactTarget};
use crate::error::ChannelError;

/// Records every attempt in the log and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl LogTransport {
    fn deliver(channel: Channel, target: &ContactTarget) -> Receipt {
        let reference = format!("log-{channel}-{}", Uuid::new_v4().simple());
        info!(
            transport = "log",
            channel = %channel,
            target = %target.redacted(),
            reference = %reference,
            "Alert delivered to log (no provider configured)"
        );
        Receipt::new(reference)
    }
}

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn call(&self, target: &ContactTarget) -> Result<Receipt, ChannelError> {
        Ok(Self::deliver(Channel::Call, target))
    }

    async fn sms(&self, target: &ContactTarget) -> Result<Receipt, ChannelError> {
        Ok(Self::deliver(Channel::Sms, target))
    }
}
