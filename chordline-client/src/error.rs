//! Client error types

use chordline_common::Provider;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout or body transfer failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success status other than a recoverable 401
    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    /// Credential rejected, or an OAuth refresh was impossible or failed
    #[error("Authentication failed for {provider}: {message}")]
    Auth { provider: Provider, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Common(#[from] chordline_common::Error),
}

impl ClientError {
    pub fn auth(provider: Provider, message: impl Into<String>) -> Self {
        ClientError::Auth {
            provider,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
