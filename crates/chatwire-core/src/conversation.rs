//! Conversation data model.
//!
//! A [`Conversation`] owns an ordered list of [`Message`]s. At most one message
//! may be in an active streaming phase at a time; [`Conversation::begin_stream`]
//! refuses to start a second one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::{MessageId, SessionId};

/// Status label shown on a fresh assistant message before the backend reports any.
pub const DEFAULT_STATUS_TEXT: &str = "Thinking...";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The local user.
    User,
    /// The backend agent.
    #[serde(alias = "bot")]
    Assistant,
}

impl Sender {
    /// Human-readable display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Streaming phase of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Final; the stream no longer touches this message.
    #[default]
    Settled,
    /// Request sent, no token received yet.
    AwaitingFirstToken,
    /// Tokens are being appended.
    Streaming,
}

impl Phase {
    /// Whether a stream currently owns a message in this phase.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::AwaitingFirstToken | Self::Streaming)
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier, unique within the conversation.
    pub id: MessageId,
    /// Author of the message.
    pub sender: Sender,
    /// Accumulated text.
    pub text: String,
    /// Streaming phase.
    pub phase: Phase,
    /// Transient progress label, only meaningful while awaiting the first token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// When the message was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether this message is owned by an in-flight stream.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    /// Check if this is a user message.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// An ordered conversation with one agent and model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    session_id: Option<SessionId>,
    agent: String,
    model: String,
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    /// Create an empty conversation with no session.
    #[must_use]
    pub fn new(agent: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            session_id: None,
            agent: agent.into(),
            model: model.into(),
            messages: Vec::new(),
            next_id: 0,
        }
    }

    /// Rebuild a conversation from stored history.
    ///
    /// Every message is settled; IDs are assigned in history order.
    #[must_use]
    pub fn from_history(
        session_id: SessionId,
        agent: impl Into<String>,
        model: impl Into<String>,
        history: impl IntoIterator<Item = (Sender, String, Option<DateTime<Utc>>)>,
    ) -> Self {
        let mut conversation = Self::new(agent, model);
        conversation.load_history(session_id, history);
        conversation
    }

    /// Replace all messages and the session with stored history.
    ///
    /// Agent and model are left to the caller. Message IDs keep counting up
    /// from where this conversation left off, so an ID handed out before the
    /// load never names a loaded message.
    pub fn load_history(
        &mut self,
        session_id: SessionId,
        history: impl IntoIterator<Item = (Sender, String, Option<DateTime<Utc>>)>,
    ) {
        self.messages.clear();
        self.session_id = Some(session_id);
        for (sender, text, timestamp) in history {
            let id = self.allocate_id();
            self.messages.push(Message {
                id,
                sender,
                text,
                phase: Phase::Settled,
                status_text: None,
                timestamp,
            });
        }
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Session ID assigned by the backend, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Selected agent.
    #[must_use]
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Selected model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Change the selected agent.
    pub fn set_agent(&mut self, agent: impl Into<String>) {
        self.agent = agent.into();
    }

    /// Change the selected model.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Messages in conversation order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Look up a message by ID.
    #[must_use]
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        // IDs are monotonic and messages are only appended, so the list is sorted.
        let index = self.messages.binary_search_by_key(&id, |m| m.id).ok()?;
        self.messages.get(index)
    }

    /// Look up a message by ID for mutation.
    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        let index = self.messages.binary_search_by_key(&id, |m| m.id).ok()?;
        self.messages.get_mut(index)
    }

    /// The message currently owned by a stream, if any.
    #[must_use]
    pub fn active_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_active())
    }

    /// Append a settled user message.
    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        let id = self.allocate_id();
        self.messages.push(Message {
            id,
            sender: Sender::User,
            text: text.into(),
            phase: Phase::Settled,
            status_text: None,
            timestamp: Some(Utc::now()),
        });
        id
    }

    /// Append an empty assistant message awaiting its first token.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StreamAlreadyActive`] if another message is still active.
    pub fn begin_stream(&mut self) -> Result<MessageId> {
        if let Some(active) = self.active_message() {
            return Err(CoreError::StreamAlreadyActive(active.id));
        }

        let id = self.allocate_id();
        self.messages.push(Message {
            id,
            sender: Sender::Assistant,
            text: String::new(),
            phase: Phase::AwaitingFirstToken,
            status_text: Some(DEFAULT_STATUS_TEXT.to_string()),
            timestamp: None,
        });
        Ok(id)
    }

    /// Assign the session ID if none is set yet.
    ///
    /// Returns `true` if the assignment took effect.
    pub fn assign_session(&mut self, id: SessionId) -> bool {
        if self.session_id.is_some() {
            return false;
        }
        self.session_id = Some(id);
        true
    }

    /// Start over: drop all messages and the session, keep agent and model.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.session_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_follow_creation_order() {
        let mut conversation = Conversation::new("Basic", "mistral");
        let a = conversation.push_user("one");
        let b = conversation.begin_stream().unwrap();
        assert!(a < b);

        let order: Vec<_> = conversation.messages().iter().map(|m| m.id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn begin_stream_starts_awaiting_with_default_status() {
        let mut conversation = Conversation::new("Basic", "mistral");
        let id = conversation.begin_stream().unwrap();

        let message = conversation.message(id).unwrap();
        assert_eq!(message.sender, Sender::Assistant);
        assert_eq!(message.phase, Phase::AwaitingFirstToken);
        assert_eq!(message.status_text.as_deref(), Some(DEFAULT_STATUS_TEXT));
        assert!(message.text.is_empty());
    }

    #[test]
    fn second_stream_is_refused_while_one_is_active() {
        let mut conversation = Conversation::new("Basic", "mistral");
        let first = conversation.begin_stream().unwrap();

        match conversation.begin_stream() {
            Err(CoreError::StreamAlreadyActive(id)) => assert_eq!(id, first),
            other => panic!("Expected StreamAlreadyActive, got {other:?}"),
        }
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn stream_can_begin_after_previous_settles() {
        let mut conversation = Conversation::new("Basic", "mistral");
        let first = conversation.begin_stream().unwrap();
        conversation.message_mut(first).unwrap().phase = Phase::Settled;

        assert!(conversation.begin_stream().is_ok());
    }

    #[test]
    fn session_is_assigned_once() {
        let mut conversation = Conversation::new("Basic", "mistral");
        assert!(conversation.assign_session(SessionId::new("abc").unwrap()));
        assert!(!conversation.assign_session(SessionId::new("xyz").unwrap()));
        assert_eq!(conversation.session_id().unwrap().as_str(), "abc");
    }

    #[test]
    fn clear_keeps_selection() {
        let mut conversation = Conversation::new("Weather", "llama3");
        conversation.push_user("hi");
        conversation.assign_session(SessionId::new("abc").unwrap());
        conversation.clear();

        assert!(conversation.messages().is_empty());
        assert!(conversation.session_id().is_none());
        assert_eq!(conversation.agent(), "Weather");
        assert_eq!(conversation.model(), "llama3");
    }

    #[test]
    fn ids_stay_unique_after_clear() {
        let mut conversation = Conversation::new("Basic", "mistral");
        let before = conversation.push_user("hi");
        conversation.clear();
        let after = conversation.push_user("again");
        assert!(after > before);
    }

    #[test]
    fn history_messages_are_settled() {
        let conversation = Conversation::from_history(
            SessionId::new("s1").unwrap(),
            "Joke",
            "mistral",
            vec![
                (Sender::User, "tell me a joke".to_string(), None),
                (Sender::Assistant, "knock knock".to_string(), None),
            ],
        );

        assert_eq!(conversation.session_id().unwrap().as_str(), "s1");
        assert_eq!(conversation.messages().len(), 2);
        assert!(conversation.messages().iter().all(|m| m.phase == Phase::Settled));
        assert!(conversation.active_message().is_none());
    }

    #[test]
    fn load_history_replaces_messages_with_fresh_ids() {
        let mut conversation = Conversation::new("Basic", "mistral");
        let stale = conversation.begin_stream().unwrap();

        conversation.load_history(
            SessionId::new("s2").unwrap(),
            vec![(Sender::User, "earlier".to_string(), None)],
        );

        assert!(conversation.message(stale).is_none());
        assert!(conversation.messages()[0].id > stale);
        assert_eq!(conversation.session_id().unwrap().as_str(), "s2");
        assert!(conversation.active_message().is_none());
    }

    #[test]
    fn bot_sender_is_an_alias_for_assistant() {
        let sender: Sender = serde_json::from_str("\"bot\"").unwrap();
        assert_eq!(sender, Sender::Assistant);
        assert_eq!(serde_json::to_string(&Sender::Assistant).unwrap(), "\"assistant\"");
    }
}
