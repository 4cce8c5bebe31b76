//! Error taxonomy for upstream calls.
//!
//! The server relays upstream failures with their original status codes, so
//! errors carry the status and body instead of collapsing into a message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Credential exchange rejected by the upstream token endpoint.
    #[error("authentication failed")]
    Auth,

    /// Non-2xx response from a list or detail call.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Connection, timeout, or body-decoding failure in the HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Upstream status code when one was received.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ApiError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
