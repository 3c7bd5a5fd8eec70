//! Failure taxonomy for a single poll cycle.
use std::time::Duration;

use reqwest::StatusCode;

/// Everything that can go wrong while polling one feed.
///
/// None of these are fatal: the monitor logs them and retries on its next tick.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, timeout or body transfer failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The fetch, including the wait for a connection slot, exceeded its bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The feed answered with something other than 2xx or 304.
    #[error("unexpected HTTP status {0}")]
    Protocol(StatusCode),
    /// The body was not a valid incidents document.
    #[error("malformed feed body: {0}")]
    Decode(#[from] serde_json::Error),
    /// A sink could not deliver an event.
    #[error("sink failed: {0}")]
    Sink(eyre::Report),
}

impl Error {
    /// Short label used as the `kind` field in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Timeout(_) => "network",
            Self::Protocol(_) => "protocol",
            Self::Decode(_) => "decode",
            Self::Sink(_) => "sink",
        }
    }

    /// Whether the failure was a request timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}
