//! Error taxonomy for outbound API calls.

use thiserror::Error;

/// Failure of a single API call
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Superseded by a newer call of the same kind, or cancelled explicitly
    #[error("Request cancelled")]
    Cancelled,

    /// Non-2xx response
    #[error("{context}: {reason}")]
    Status {
        context: &'static str,
        status: u16,
        reason: String,
    },

    /// DNS, connectivity and other transport failures
    #[error("{0}")]
    Network(String),

    /// 2xx response whose body could not be decoded
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// Whether another attempt could succeed. Cancellation never retries.
    pub fn is_retryable(&self) -> bool {
        !self.is_cancelled()
    }
}
