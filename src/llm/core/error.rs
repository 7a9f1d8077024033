//! Error types for the LLM layer

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling an LLM provider
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// No credentials or endpoint configured for the provider
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Authentication/token issues
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// HTTP request failures
    #[error("HTTP error (status {status}): {body}")]
    HttpError { status: u16, body: String },

    /// The provider could not be reached
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The call did not settle within the allotted time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// JSON encoding/decoding issues
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded (retry after {retry_after:?})")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// Provider-specific errors
    #[error("Provider error ({code}): {message}")]
    ProviderError { code: String, message: String },
}

/// Coarse classification of provider failures that drives retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Provider signaled throttling; retry with backoff
    RateLimited,
    /// Network failure or timeout; retry a limited number of times
    Transient,
    /// The request itself is wrong; never retried
    InvalidRequest,
    /// Provider cannot serve this operation at all; never retried
    ProviderUnavailable,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::Transient)
    }
}

impl LlmError {
    /// Build an error from a non-success HTTP status
    pub fn from_status(status: u16, body: String, retry_after: Option<Duration>) -> Self {
        match status {
            429 => LlmError::RateLimitExceeded { retry_after },
            401 | 403 => LlmError::AuthenticationError(body),
            400 | 404 | 413 | 422 => LlmError::InvalidRequest(body),
            _ => LlmError::HttpError { status, body },
        }
    }

    /// Classify this error for the retry state machine
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::RateLimitExceeded { .. } => ErrorKind::RateLimited,
            LlmError::HttpError { status, .. } => match status {
                0 | 408 | 409 | 500..=599 => ErrorKind::Transient,
                _ => ErrorKind::InvalidRequest,
            },
            LlmError::ConnectionError(_)
            | LlmError::Timeout(_)
            | LlmError::SerializationError(_) => ErrorKind::Transient,
            LlmError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            LlmError::NotConfigured(_)
            | LlmError::AuthenticationError(_)
            | LlmError::ProviderError { .. } => ErrorKind::ProviderUnavailable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Delay requested by the provider before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitExceeded { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            LlmError::HttpError {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            LlmError::SerializationError(err.to_string())
        } else {
            LlmError::ConnectionError(err.to_string())
        }
    }
}
