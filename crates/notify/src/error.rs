//! Error types for the alert fan-out.

use thiserror::Error;

/// Errors a single channel attempt can end with.
///
/// The fan-out never propagates these; they are logged and recorded in the
/// round's outcome set.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed (connection, timeout, decoding)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// Transport is missing credentials or settings
    #[error("Transport not configured: {0}")]
    NotConfigured(String),

    /// The dispatch pool could not run the attempt
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] PoolError),
}

/// Errors raised by the [`crate::DispatchPool`] itself.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool's semaphore was closed
    #[error("dispatch pool is closed")]
    Closed,

    /// The offloaded task panicked or was cancelled
    #[error("dispatch task aborted: {0}")]
    Aborted(String),
}

/// A contact target that does not look like a phone number.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid contact target {value:?}: {reason}")]
pub struct InvalidTarget {
    pub value: String,
    pub reason: &'static str,
}
