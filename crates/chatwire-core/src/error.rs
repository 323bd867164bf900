//! Common error types for chatwire.

use crate::ids::MessageId;
use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by conversation operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stream is already in flight for this conversation.
    #[error("message {0} is still streaming")]
    StreamAlreadyActive(MessageId),
}
