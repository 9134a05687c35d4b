//! Crate-wide error type.
//!
//! Only [`NewsError::Config`] is fatal to a run. Every other variant is
//! logged where it happens and degraded into an absent language cell, a
//! placeholder thumbnail or an unpersisted subject.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NewsError>;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for NewsError {
    fn from(err: reqwest::Error) -> Self {
        NewsError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for NewsError {
    fn from(err: serde_json::Error) -> Self {
        NewsError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for NewsError {
    fn from(err: serde_yaml::Error) -> Self {
        NewsError::Config(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for NewsError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        NewsError::Auth(err.to_string())
    }
}
