//! Stream orchestration.
//!
//! [`StreamOrchestrator::run`] drives one response stream from open to
//! settle:
//!
//! ```text
//! open ──► read ──► bytes ──► lines ──► events ──► apply
//!  ▲         │                  │                     │
//!  │     cancelled?         cancelled?            Completed?
//!  │         ▼                  ▼                     ▼
//!  └──── Cancelled          Cancelled             Completed
//! ```
//!
//! Cancellation is checked before each read, right after each read (bytes
//! read after a cancel are dropped unprocessed), and before each line. The
//! open call and every read are also raced against the cancel signal, so a
//! stalled backend cannot hold a cancelled run open. Whatever the exit, the
//! active message is settled exactly once and the handle is marked settled.

use std::sync::Arc;

use chatwire_core::{
    apply_event, settle_cancelled, settle_ended, settle_failed, Applied, MessageId, StreamEvent,
};
use futures::StreamExt;

use crate::cancel::CancelHandle;
use crate::decode::decode_line;
use crate::error::StreamError;
use crate::frame::{LineAssembler, Utf8ChunkDecoder};
use crate::shared::SharedConversation;
use crate::transport::Transport;
use crate::types::AgentRequest;

/// How a stream run ended without a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The backend sent its completion event.
    Completed,
    /// The transport closed without a completion event.
    Ended,
    /// Cancellation was requested.
    Cancelled,
}

/// Drives response streams into a conversation.
#[derive(Clone)]
pub struct StreamOrchestrator {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for StreamOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOrchestrator").finish_non_exhaustive()
    }
}

impl StreamOrchestrator {
    /// Create an orchestrator over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run one stream for the active message `message_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Transport`] if opening or reading the stream
    /// fails. The message has already been settled with the failure text by
    /// then.
    pub async fn run(
        &self,
        conversation: &SharedConversation,
        message_id: MessageId,
        request: &AgentRequest,
        cancel: &CancelHandle,
    ) -> Result<StreamOutcome, StreamError> {
        let result = self.drive(conversation, message_id, request, cancel).await;

        match &result {
            Ok(StreamOutcome::Completed) => {
                tracing::debug!(message_id = %message_id, "Stream completed");
            }
            Ok(StreamOutcome::Ended) => {
                conversation.update(|c| settle_ended(c, message_id));
                tracing::debug!(message_id = %message_id, "Stream closed without completion");
            }
            Ok(StreamOutcome::Cancelled) => {
                conversation.update(|c| settle_cancelled(c, message_id));
                tracing::info!(message_id = %message_id, "Stream cancelled");
            }
            Err(e) => {
                conversation.update(|c| settle_failed(c, message_id));
                tracing::warn!(message_id = %message_id, error = %e, "Stream failed");
            }
        }
        cancel.mark_settled();

        result
    }

    async fn drive(
        &self,
        conversation: &SharedConversation,
        message_id: MessageId,
        request: &AgentRequest,
        cancel: &CancelHandle,
    ) -> Result<StreamOutcome, StreamError> {
        let mut body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            opened = self.transport.open(request) => opened?,
        };
        tracing::debug!(message_id = %message_id, "Stream opened");

        let mut session = StreamSession::new(message_id);
        loop {
            if cancel.is_cancelled() {
                return Ok(StreamOutcome::Cancelled);
            }

            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                next = body.next() => next,
            };

            // A cancel that landed during the read wins over its bytes.
            if cancel.is_cancelled() {
                return Ok(StreamOutcome::Cancelled);
            }

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    session.finish();
                    return Ok(StreamOutcome::Ended);
                }
            };

            for line in session.feed(&chunk) {
                if cancel.is_cancelled() {
                    return Ok(StreamOutcome::Cancelled);
                }
                if session.handle_line(conversation, &line) == Applied::Completed {
                    return Ok(StreamOutcome::Completed);
                }
            }
        }
    }
}

/// Per-run decoding state; dropped when the run ends.
struct StreamSession {
    message_id: MessageId,
    text: Utf8ChunkDecoder,
    lines: LineAssembler,
    first_token_seen: bool,
}

impl StreamSession {
    fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            text: Utf8ChunkDecoder::new(),
            lines: LineAssembler::new(),
            first_token_seen: false,
        }
    }

    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.text.decode(chunk);
        self.lines.feed(&text)
    }

    /// Decode one line and apply its events in order.
    fn handle_line(&mut self, conversation: &SharedConversation, line: &str) -> Applied {
        let Some(decoded) = decode_line(line) else {
            return Applied::Ignored;
        };

        let mut last = Applied::Ignored;
        for event in decoded {
            if let StreamEvent::Malformed { raw } = &event {
                tracing::debug!(message_id = %self.message_id, raw = %raw, "Skipping malformed event");
                continue;
            }

            let message_id = self.message_id;
            last = conversation.update(|c| apply_event(c, message_id, &event));
            tracing::trace!(
                message_id = %message_id,
                kind = event.kind(),
                applied = ?last,
                "Applied event"
            );

            match &event {
                StreamEvent::Token { .. } if !self.first_token_seen && last == Applied::Updated => {
                    self.first_token_seen = true;
                    tracing::debug!(message_id = %message_id, "First token");
                }
                StreamEvent::SessionAssigned { id } if last == Applied::Updated => {
                    tracing::debug!(message_id = %message_id, session_id = %id, "Session assigned");
                }
                _ => {}
            }

            if last == Applied::Completed {
                break;
            }
        }
        last
    }

    fn finish(&mut self) {
        let undecoded = self.text.finish();
        let dangling = self.lines.finish();
        if undecoded.is_some() || dangling.is_some() {
            tracing::debug!(
                message_id = %self.message_id,
                dangling = ?dangling,
                undecoded = ?undecoded,
                "Discarding unterminated input at end of stream"
            );
        }
    }
}
