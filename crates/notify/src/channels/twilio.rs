//! Twilio voice and SMS transport.
//!
//! Uses the Twilio REST API (2010-04-01) `Calls` and `Messages` resources.
//! Both are form-encoded POSTs authenticated with the account SID and auth
//! token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{Receipt, Transport};
use crate::contact::{Channel, ContactTarget};
use crate::error::ChannelError;

/// Public Twilio API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// TwiML spoken on every alert call.
const CALL_TWIML: &str = "<Response><Say voice=\"alice\">\
    Emergency alert triggered. Please check the monitoring system immediately.\
    </Say></Response>";

/// Body of every alert text message.
const SMS_BODY: &str =
    "\u{1f6a8} ALERT: Emergency detected! Please check the monitoring system immediately.";

/// Credentials and sender number for the Twilio account.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Caller ID / sender number for calls and messages.
    pub from_number: String,
    /// API base URL, overridable for testing.
    pub api_base: String,
}

impl TwilioConfig {
    #[must_use]
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Twilio transport.
#[derive(Clone)]
pub struct TwilioTransport {
    client: Client,
    config: TwilioConfig,
}

impl TwilioTransport {
    /// Create a new Twilio transport.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created or the config is
    /// incomplete.
    pub fn new(config: TwilioConfig) -> Result<Self, ChannelError> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(ChannelError::NotConfigured(
                "TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN".to_string(),
            ));
        }
        if config.from_number.is_empty() {
            return Err(ChannelError::NotConfigured("TWILIO_PHONE_NUMBER".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, config })
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{resource}.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    /// POST a form to a Twilio resource and return the created resource SID.
    async fn create(
        &self,
        channel: Channel,
        resource: &str,
        form: &[(&str, &str)],
    ) -> Result<Receipt, ChannelError> {
        let url = self.resource_url(resource);
        debug!(channel = %channel, url = %url, "POST request (form)");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let created: CreatedResource = response.json().await?;
            Ok(Receipt::new(created.sid))
        } else {
            let body = response.text().await.unwrap_or_default();

            warn!(
                channel = %channel,
                status = %status,
                body = %body,
                "Twilio request failed"
            );

            Err(ChannelError::Provider {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

#[async_trait]
impl Transport for TwilioTransport {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn call(&self, target: &ContactTarget) -> Result<Receipt, ChannelError> {
        let form = [
            ("To", target.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Twiml", CALL_TWIML),
        ];
        let receipt = self.create(Channel::Call, "Calls", &form).await?;
        info!(target = %target.redacted(), sid = %receipt.reference, "Call initiated");
        Ok(receipt)
    }

    async fn sms(&self, target: &ContactTarget) -> Result<Receipt, ChannelError> {
        let form = [
            ("To", target.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", SMS_BODY),
        ];
        let receipt = self.create(Channel::Sms, "Messages", &form).await?;
        info!(target = %target.redacted(), sid = %receipt.reference, "SMS sent");
        Ok(receipt)
    }
}

// =============================================================================
// Twilio API types
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreatedResource {
    sid: String,
}
