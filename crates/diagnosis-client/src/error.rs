//! Diagnosis client errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when asking the diagnosis service for a verdict
#[derive(Debug, Error)]
pub enum DiagnosisError {
    /// Client is not configured to call the service (e.g. no API key)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request could not be sent or the response could not be read
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Upstream error: {status} - {body}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Service answered successfully but returned no choices
    #[error("Empty result: diagnosis service returned no choices")]
    EmptyResult,

    /// Response body was not a chat-completion payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller's deadline elapsed before a response arrived
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl DiagnosisError {
    /// HTTP status of an upstream rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DiagnosisError::Upstream { status, .. } => Some(*status),
            DiagnosisError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
