use thiserror::Error;

use crate::schema::error::SchemaError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} {reason}: {url}")]
    Status {
        status: u16,
        reason: String,
        url: String,
    },
}

impl FetchError {
    /// HTTP status of a non-200 response
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Network(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid metadata: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid version \"{0}\"")]
    InvalidVersion(String),

    #[error("Client state lock poisoned")]
    LockPoisoned,
}
