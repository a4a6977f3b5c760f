//! Recognition failure taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Why a submission produced no result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    #[error("Network error: {message}")]
    Network {
        /// Human-readable transport or service message
        message: String,
        /// HTTP status, when the service answered at all
        status: Option<u16>,
    },

    #[error("Recognition timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Superseded or reset before resolving. Never shown to the user.
    #[error("Recognition cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for RecognitionError {
    fn from(error: reqwest::Error) -> Self {
        RecognitionError::Network {
            message: error.to_string(),
            status: error.status().map(|s| s.as_u16()),
        }
    }
}
