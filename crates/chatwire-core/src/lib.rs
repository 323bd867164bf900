//! Core types for chatwire.
//!
//! This crate holds everything about a conversation that does not touch the
//! network:
//!
//! - **Identifiers**: backend session IDs and per-conversation message IDs
//! - **Conversation model**: ordered messages with a single in-flight stream
//! - **Stream events**: the decoded, tagged events a response stream produces
//! - **Reconciliation**: the state machine that applies events to a conversation
//!
//! # Example
//!
//! ```
//! use chatwire_core::{apply_event, Applied, Conversation, Phase, SessionId, StreamEvent};
//!
//! let mut conversation = Conversation::new("Basic", "mistral");
//! conversation.push_user("Hello?");
//! let id = conversation.begin_stream().unwrap();
//!
//! apply_event(&mut conversation, id, &StreamEvent::Token { text: "Hi".into() });
//! let session = SessionId::new("abc").unwrap();
//! apply_event(&mut conversation, id, &StreamEvent::SessionAssigned { id: session });
//! let applied = apply_event(&mut conversation, id, &StreamEvent::Completed);
//!
//! assert_eq!(applied, Applied::Completed);
//! assert_eq!(conversation.message(id).unwrap().text, "Hi");
//! assert_eq!(conversation.message(id).unwrap().phase, Phase::Settled);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod conversation;
pub mod error;
pub mod event;
pub mod ids;
pub mod reconcile;

pub use conversation::{Conversation, Message, Phase, Sender, DEFAULT_STATUS_TEXT};
pub use error::{CoreError, Result};
pub use event::StreamEvent;
pub use ids::{IdError, MessageId, SessionId};
pub use reconcile::{
    apply_event, settle_cancelled, settle_ended, settle_failed, Applied, FAILURE_TEXT,
};
