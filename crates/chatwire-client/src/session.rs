//! Chat session facade.
//!
//! [`ChatSession`] is what a front end talks to: it owns one conversation,
//! starts and cancels streams against it, and wraps the history calls that
//! replace or clear it. At most one stream is active at a time; sending while
//! a stream runs cancels that stream first.
//!
//! Besides the orchestrator, this facade is the one other place that settles
//! an active message: [`ChatSession::cancel`] settles it on the spot, and the
//! orchestrator's later updates for that message are no-ops.

use std::sync::Arc;

use chatwire_core::{settle_cancelled, Conversation, CoreError, MessageId, SessionId};
use tokio::task::JoinHandle;

use crate::cancel::CancelHandle;
use crate::client::{BackendClient, HistoryApi};
use crate::error::{Result, SessionError, StreamError};
use crate::shared::SharedConversation;
use crate::stream::{StreamOrchestrator, StreamOutcome};
use crate::transport::Transport;
use crate::types::{AgentRequest, SessionSummary, KNOWN_AGENTS};

/// The stream currently owning the conversation's active message.
#[derive(Debug, Clone)]
struct ActiveStream {
    message_id: MessageId,
    cancel: CancelHandle,
}

/// Handle to a running stream.
#[derive(Debug)]
pub struct StreamHandle {
    message_id: MessageId,
    cancel: CancelHandle,
    join: JoinHandle<std::result::Result<StreamOutcome, StreamError>>,
}

impl StreamHandle {
    /// ID of the assistant message this stream fills.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// The stream's cancellation handle.
    #[must_use]
    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Request cancellation. Returns `false` if the stream already settled.
    pub fn cancel(&self) -> bool {
        self.cancel.request_cancel()
    }

    /// Whether the stream task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the stream to end.
    ///
    /// # Errors
    ///
    /// Returns the stream's transport error, or [`StreamError::Task`] if the
    /// task panicked.
    pub async fn wait(self) -> std::result::Result<StreamOutcome, StreamError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(StreamError::Task(e.to_string())),
        }
    }
}

/// One conversation with the agent backend.
pub struct ChatSession {
    conversation: SharedConversation,
    transport: Arc<dyn Transport>,
    history: Arc<dyn HistoryApi>,
    models: Vec<String>,
    active: Option<ActiveStream>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("conversation", &self.conversation)
            .field("models", &self.models)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Create a session with an empty conversation.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        history: Arc<dyn HistoryApi>,
        agent: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            conversation: SharedConversation::new(Conversation::new(agent, model)),
            transport,
            history,
            models: Vec::new(),
            active: None,
        }
    }

    /// Create a session that uses `client` for both streaming and history.
    #[must_use]
    pub fn with_backend(client: BackendClient) -> Self {
        let agent = client.config().default_agent.clone();
        let model = client.config().default_model.clone();
        let client = Arc::new(client);
        let transport: Arc<dyn Transport> = client.clone();
        Self::new(transport, client, agent, model)
    }

    /// The shared conversation, for observing progress.
    #[must_use]
    pub fn conversation(&self) -> &SharedConversation {
        &self.conversation
    }

    /// Models from the last successful refresh.
    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Selected agent.
    #[must_use]
    pub fn agent(&self) -> String {
        self.conversation.read(|c| c.agent().to_string())
    }

    /// Selected model.
    #[must_use]
    pub fn model(&self) -> String {
        self.conversation.read(|c| c.model().to_string())
    }

    /// Whether a stream is still running.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active.as_ref().is_some_and(|a| !a.cancel.is_settled())
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Send a user message and start streaming the reply.
    ///
    /// Any stream still running is cancelled and settled first. Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyMessage`] if `text` is blank.
    pub fn send(&mut self, text: &str) -> Result<StreamHandle> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.cancel();

        let (message_id, request) = self.conversation.update(|c| {
            if let Some(active) = c.active_message() {
                return Err(CoreError::StreamAlreadyActive(active.id));
            }
            c.push_user(text);
            let id = c.begin_stream()?;
            let request = AgentRequest {
                agent: c.agent().to_string(),
                message: text.to_string(),
                model: c.model().to_string(),
                session_id: c.session_id().cloned(),
            };
            Ok((id, request))
        })?;

        tracing::info!(
            message_id = %message_id,
            agent = %request.agent,
            model = %request.model,
            "Sending message"
        );

        let cancel = CancelHandle::new();
        let orchestrator = StreamOrchestrator::new(Arc::clone(&self.transport));
        let conversation = self.conversation.clone();
        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            orchestrator
                .run(&conversation, message_id, &request, &task_cancel)
                .await
        });

        self.active = Some(ActiveStream {
            message_id,
            cancel: cancel.clone(),
        });

        Ok(StreamHandle {
            message_id,
            cancel,
            join,
        })
    }

    /// Cancel the running stream, if any, and settle its message now.
    ///
    /// Returns `true` if a running stream was cancelled.
    pub fn cancel(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        if !active.cancel.request_cancel() {
            return false;
        }
        self.conversation
            .update(|c| settle_cancelled(c, active.message_id));
        tracing::debug!(message_id = %active.message_id, "Cancelled active stream");
        true
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Fetch the model list.
    ///
    /// A non-empty list replaces the known models; if the selected model is
    /// not among them, the first one is selected. An empty list changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the selection is left unchanged.
    pub async fn refresh_models(&mut self) -> Result<&[String]> {
        let models = self.history.list_models().await?;
        let Some(first) = models.first().cloned() else {
            tracing::warn!("Backend returned no models, keeping current selection");
            return Ok(self.models.as_slice());
        };

        let current = self.model();
        if !models.contains(&current) {
            tracing::info!(from = %current, to = %first, "Selected model not offered, switching");
            self.conversation.update(|c| c.set_model(first));
        }
        self.models = models;
        Ok(self.models.as_slice())
    }

    /// Select an agent by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownAgent`] if the name is not a known agent.
    pub fn select_agent(&mut self, name: &str) -> Result<()> {
        let agent = KNOWN_AGENTS
            .iter()
            .find(|a| a.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SessionError::UnknownAgent(name.to_string()))?;
        self.conversation.update(|c| c.set_agent(*agent));
        Ok(())
    }

    /// Select a model.
    ///
    /// Before the first successful refresh any name is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownModel`] if the model list is known and
    /// does not contain `name`.
    pub fn select_model(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if !self.models.is_empty() && !self.models.iter().any(|m| m == name) {
            return Err(SessionError::UnknownModel(name.to_string()));
        }
        self.conversation.update(|c| c.set_model(name));
        Ok(())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Start a new conversation, keeping agent and model.
    pub fn new_chat(&mut self) {
        self.cancel();
        self.conversation.update(Conversation::clear);
        tracing::debug!("Started new chat");
    }

    /// List stored sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.history.list_sessions().await?)
    }

    /// Replace the conversation with a stored session.
    ///
    /// The session's agent and model are selected when the backend reports them.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be fetched; the current
    /// conversation is left untouched in that case.
    pub async fn load_session(&mut self, session_id: &SessionId) -> Result<()> {
        let history = self.history.get_session(session_id).await?;
        self.cancel();

        let agent = history.agent_name.filter(|a| !a.is_empty());
        let model = history.model.filter(|m| !m.is_empty());
        let count = history.messages.len();
        self.conversation.update(|c| {
            if let Some(agent) = agent {
                c.set_agent(agent);
            }
            if let Some(model) = model {
                c.set_model(model);
            }
            c.load_history(
                session_id.clone(),
                history
                    .messages
                    .into_iter()
                    .map(|m| (m.sender, m.message, m.timestamp)),
            );
        });

        tracing::info!(session_id = %session_id, messages = count, "Loaded session");
        Ok(())
    }

    /// Delete a stored session; if it is the current one, start a new chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_session(&mut self, session_id: &SessionId) -> Result<()> {
        self.history.delete_session(session_id).await?;

        let is_current = self
            .conversation
            .read(|c| c.session_id() == Some(session_id));
        if is_current {
            self.new_chat();
        }
        tracing::info!(session_id = %session_id, current = is_current, "Deleted session");
        Ok(())
    }
}
