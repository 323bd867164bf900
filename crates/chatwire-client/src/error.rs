//! Error types for the chatwire client.
//!
//! Cancellation is deliberately absent from every enum here: a cancelled
//! stream is a clean outcome, reported as
//! [`StreamOutcome::Cancelled`](crate::StreamOutcome::Cancelled).

use chatwire_core::CoreError;
use thiserror::Error;

/// Error type for REST operations against the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, if any.
        message: String,
    },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The configured base URL is unusable.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

/// Transport-level faults while opening or reading a response stream.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Reading the response body failed.
    #[error("read failed: {0}")]
    Read(String),
}

/// Errors that end a stream run.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The transport failed; the active message was settled with a failure indication.
    #[error("stream transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The stream task panicked or was aborted before reporting an outcome.
    #[error("stream task failed: {0}")]
    Task(String),
}

/// Errors from chat-session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The message to send was empty.
    #[error("message is empty")]
    EmptyMessage,

    /// The requested agent is not one the backend knows.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// The requested model is not in the backend's model list.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Conversation invariant violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// REST call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A result type using `SessionError`.
pub type Result<T> = std::result::Result<T, SessionError>;
