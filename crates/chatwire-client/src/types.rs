//! Wire types for the agent backend.
//!
//! These types mirror the request and response bodies of the backend's REST
//! API. The streamed event payloads are handled separately in
//! [`decode`](crate::decode).

use chatwire_core::{SessionId, Sender};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Agents and Models
// =============================================================================

/// Agents offered by the backend, in display order.
pub const KNOWN_AGENTS: &[&str] = &[
    "Basic",
    "Weather",
    "News",
    "To-Do",
    "Stock",
    "Quiz",
    "Writing Feedback",
    "Joke",
];

/// Agent selected when nothing else is configured.
pub const DEFAULT_AGENT: &str = "Basic";

/// Model selected until the backend's model list says otherwise.
pub const DEFAULT_MODEL: &str = "mistral";

/// Response for listing models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListModelsResponse {
    /// Model identifiers, in backend order.
    #[serde(default)]
    pub models: Vec<String>,
}

// =============================================================================
// Streaming Request
// =============================================================================

/// Request that starts a streamed agent response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Agent name.
    pub agent: String,
    /// The user's message.
    pub message: String,
    /// Model identifier.
    pub model: String,
    /// Existing session, or `null` to let the backend create one.
    pub session_id: Option<SessionId>,
}

// =============================================================================
// Session History Types
// =============================================================================

/// Summary of a stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session ID.
    pub session_id: SessionId,
    /// Agent used in the conversation.
    #[serde(default)]
    pub agent_name: Option<String>,
    /// Model used in the conversation.
    #[serde(default)]
    pub model: Option<String>,
    /// Preview of the first message.
    #[serde(default)]
    pub first_message: String,
    /// Number of stored messages.
    #[serde(default)]
    pub message_count: usize,
    /// Creation timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response for listing sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    /// Sessions, most recently updated first.
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

/// A stored message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who wrote the message.
    pub sender: Sender,
    /// Message text.
    #[serde(default)]
    pub message: String,
    /// When it was written.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Full history of one stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    /// Messages in conversation order.
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
    /// Agent used.
    #[serde(default)]
    pub agent_name: Option<String>,
    /// Model used.
    #[serde(default)]
    pub model: Option<String>,
}

// =============================================================================
// Error Response
// =============================================================================

/// Error response from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error message.
    pub error: String,
    /// Optional error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Accept RFC 3339 or a naive ISO-8601 timestamp (read as UTC).
///
/// Unparseable values become `None` rather than failing the whole response.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
