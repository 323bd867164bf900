//! Conversation state machine.
//!
//! Applies decoded [`StreamEvent`]s to the active message of a conversation.
//! Per message the phases move strictly forward:
//!
//! ```text
//! AwaitingFirstToken --Token--> Streaming --Completed--> Settled
//!          |                        |
//!          +--- Completed / cancel / transport fault ---> Settled
//! ```
//!
//! Nothing ever leaves `Settled`. Every function here is synchronous, so one
//! event is fully applied before the caller can suspend again.

use chrono::Utc;

use crate::conversation::{Conversation, Message, Phase};
use crate::event::StreamEvent;
use crate::ids::MessageId;

/// Failure indication shown when the transport breaks mid-stream.
pub const FAILURE_TEXT: &str = "Error contacting agent.";

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// State changed.
    Updated,
    /// The event had no effect.
    Ignored,
    /// The event settled the message; the logical stream is over.
    Completed,
}

/// Apply one event to the active message `active` of `conversation`.
///
/// Events addressed to a settled or unknown message are ignored.
pub fn apply_event(
    conversation: &mut Conversation,
    active: MessageId,
    event: &StreamEvent,
) -> Applied {
    match event {
        StreamEvent::SessionAssigned { id } => {
            if conversation.assign_session(id.clone()) {
                Applied::Updated
            } else {
                Applied::Ignored
            }
        }
        StreamEvent::Malformed { .. } => Applied::Ignored,
        StreamEvent::Status { label } => with_active(conversation, active, |message| {
            if message.phase != Phase::AwaitingFirstToken {
                // Superseded once tokens flow.
                return Applied::Ignored;
            }
            message.status_text = Some(label.clone());
            Applied::Updated
        }),
        StreamEvent::Token { text } => with_active(conversation, active, |message| {
            if message.phase == Phase::AwaitingFirstToken {
                message.phase = Phase::Streaming;
                message.status_text = None;
            }
            message.text.push_str(text);
            Applied::Updated
        }),
        StreamEvent::Completed => with_active(conversation, active, |message| {
            settle(message);
            Applied::Completed
        }),
    }
}

/// Settle a message after user cancellation.
///
/// Accumulated text is kept exactly as it is; no failure text is added.
pub fn settle_cancelled(conversation: &mut Conversation, active: MessageId) -> Applied {
    with_active(conversation, active, |message| {
        settle(message);
        Applied::Updated
    })
}

/// Settle a message whose transport closed without a completion event.
pub fn settle_ended(conversation: &mut Conversation, active: MessageId) -> Applied {
    with_active(conversation, active, |message| {
        settle(message);
        Applied::Updated
    })
}

/// Settle a message after a transport fault, adding the failure indication.
///
/// The indication replaces empty text and follows partial text on its own paragraph.
pub fn settle_failed(conversation: &mut Conversation, active: MessageId) -> Applied {
    with_active(conversation, active, |message| {
        if message.text.is_empty() {
            message.text.push_str(FAILURE_TEXT);
        } else {
            message.text.push_str("\n\n");
            message.text.push_str(FAILURE_TEXT);
        }
        settle(message);
        Applied::Updated
    })
}

fn settle(message: &mut Message) {
    message.phase = Phase::Settled;
    message.status_text = None;
    message.timestamp = Some(Utc::now());
}

/// Run `f` on the message if it exists and is still active.
fn with_active(
    conversation: &mut Conversation,
    id: MessageId,
    f: impl FnOnce(&mut Message) -> Applied,
) -> Applied {
    match conversation.message_mut(id) {
        Some(message) if message.is_active() => f(message),
        _ => Applied::Ignored,
    }
}
