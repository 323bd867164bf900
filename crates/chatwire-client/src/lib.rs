//! Streaming client for chatwire.
//!
//! This crate talks to the agent backend and keeps a conversation in sync with
//! the replies it streams back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ChatSession                          │
//! │   send / cancel / refresh_models / load / delete / new_chat  │
//! └──────────────────────────────────────────────────────────────┘
//!          │ spawns                              │ REST
//!          ▼                                     ▼
//! ┌───────────────────────┐             ┌────────────────────┐
//! │  StreamOrchestrator   │             │     HistoryApi     │
//! │  frame ─► decode ─►   │             └────────────────────┘
//! │  apply_event          │                       │
//! └───────────────────────┘                       │
//!          │ Transport                            │
//!          ▼                                      ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   BackendClient (reqwest)                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use chatwire_client::{BackendClient, ChatSession, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BackendClient::new(ClientConfig::default())?;
//! let mut session = ChatSession::with_backend(client);
//!
//! let handle = session.send("What's the weather in Oslo?")?;
//! let id = handle.message_id();
//! let outcome = handle.wait().await?;
//!
//! let reply = session.conversation().read(|c| c.message(id).map(|m| m.text.clone()));
//! println!("{outcome:?}: {}", reply.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cancel;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod frame;
pub mod session;
pub mod shared;
pub mod stream;
pub mod transport;
pub mod types;

pub use cancel::CancelHandle;
pub use client::{BackendClient, HistoryApi};
pub use config::ClientConfig;
pub use decode::{decode_line, DecodedLine, EVENT_PREFIX};
pub use error::{ClientError, Result, SessionError, StreamError, TransportError};
pub use frame::{LineAssembler, Utf8ChunkDecoder};
pub use session::{ChatSession, StreamHandle};
pub use shared::SharedConversation;
pub use stream::{StreamOrchestrator, StreamOutcome};
pub use transport::{ByteStream, Transport};
pub use types::{
    AgentRequest, HistoryMessage, SessionHistory, SessionSummary, DEFAULT_AGENT, DEFAULT_MODEL,
    KNOWN_AGENTS,
};
