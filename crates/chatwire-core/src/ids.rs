//! Identifier types for chatwire.
//!
//! Session IDs are opaque values handed out by the backend; message IDs are
//! allocated locally by a [`Conversation`](crate::Conversation).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque session identifier assigned by the backend.
///
/// The client never interprets the contents. The only constraint enforced
/// locally is that the identifier is not empty.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Create a `SessionId` from a backend-provided string.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] if the string is empty or only whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(value))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a message within one conversation.
///
/// Allocated from a monotonic counter, so ordering by ID is creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Create a `MessageId` from its raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Return the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier was empty.
    #[error("identifier is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_empty() {
        assert_eq!(SessionId::new(""), Err(IdError::Empty));
        assert_eq!(SessionId::new("   "), Err(IdError::Empty));
    }

    #[test]
    fn session_id_is_opaque() {
        let id: SessionId = "0f8c-weird/id".parse().unwrap();
        assert_eq!(id.as_str(), "0f8c-weird/id");
        assert_eq!(id.to_string(), "0f8c-weird/id");
    }

    #[test]
    fn session_id_serde_as_string() {
        let id = SessionId::new("abc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");

        let parsed: SessionId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(parsed, id);

        assert!(serde_json::from_str::<SessionId>("\"\"").is_err());
    }

    #[test]
    fn message_id_orders_by_creation() {
        let first = MessageId::from_raw(1);
        let second = MessageId::from_raw(2);
        assert!(first < second);
        assert_eq!(second.to_string(), "#2");
    }
}
