//! Decoded stream events.

use crate::ids::SessionId;

/// One application-level event decoded from a response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Transient progress label, shown until the first token arrives.
    Status {
        /// Human-readable label.
        label: String,
    },
    /// Incremental text fragment to append.
    Token {
        /// Text fragment.
        text: String,
    },
    /// The backend assigned a session ID to this conversation.
    SessionAssigned {
        /// Assigned session ID.
        id: SessionId,
    },
    /// The logical stream is complete.
    Completed,
    /// A `data:` line whose payload could not be parsed.
    ///
    /// Carried only so the boundary can log it; it never changes state.
    Malformed {
        /// The raw payload text.
        raw: String,
    },
}

impl StreamEvent {
    /// Short name of the event kind, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Token { .. } => "token",
            Self::SessionAssigned { .. } => "session_assigned",
            Self::Completed => "completed",
            Self::Malformed { .. } => "malformed",
        }
    }

    /// Whether this event ends the logical stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
