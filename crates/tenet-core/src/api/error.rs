use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::credentials::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session is no longer valid")]
    Unauthorized,

    #[error("Server error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StoreError),
}

/// Maximum length for server-provided messages carried in errors
const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a server message to avoid dragging response bodies around
    fn truncate_message(message: &str) -> String {
        if message.len() <= MAX_ERROR_MESSAGE_LENGTH {
            message.to_string()
        } else {
            let cut = message
                .char_indices()
                .take_while(|(i, _)| *i < MAX_ERROR_MESSAGE_LENGTH)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            format!(
                "{}... (truncated, {} total bytes)",
                &message[..cut],
                message.len()
            )
        }
    }

    /// Build the error for a response the server refused. 401 always means
    /// the bearer was rejected; everything else keeps the server's message
    /// when one was sent, or falls back to a status-derived one.
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized;
        }
        let message = message
            .filter(|m| !m.trim().is_empty())
            .map(|m| Self::truncate_message(&m))
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        ApiError::Remote {
            status: status.as_u16(),
            message,
        }
    }

    /// Classify a transport-level failure, keeping timeouts distinct so
    /// callers can message them differently.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
