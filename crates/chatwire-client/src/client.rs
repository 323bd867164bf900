//! HTTP client for the agent backend.
//!
//! [`BackendClient`] covers both halves of the backend API: the REST calls for
//! models and stored sessions ([`HistoryApi`]) and the streamed agent response
//! ([`Transport`]).

use async_trait::async_trait;
use chatwire_core::SessionId;
use futures::StreamExt;
use reqwest::{Client, StatusCode, Url};

use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::transport::{ByteStream, Transport};
use crate::types::{
    AgentRequest, ApiErrorResponse, ListModelsResponse, ListSessionsResponse, SessionHistory,
    SessionSummary,
};

/// Trait for the backend's REST surface.
///
/// This trait abstracts model and session-history calls, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// List the models the backend can run.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response is invalid.
    async fn list_models(&self) -> Result<Vec<String>, ClientError>;

    /// List stored sessions, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response is invalid.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError>;

    /// Fetch the full history of one session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the session does not exist.
    async fn get_session(&self, session_id: &SessionId) -> Result<SessionHistory, ClientError>;

    /// Delete a session. Deleting a session that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails.
    async fn delete_session(&self, session_id: &SessionId) -> Result<(), ClientError>;
}

/// Client for the agent backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    config: ClientConfig,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// Only the connect timeout applies to every request; REST calls add the
    /// request timeout, streamed responses run as long as the backend sends.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a backend client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: Client, mut config: ClientConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { client, config }
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build an endpoint URL from path segments; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", self.config.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Handle API error responses.
    async fn handle_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(err) => err.error,
            Err(_) => "Unknown error".to_string(),
        };
        ClientError::Api { status, message }
    }
}

#[async_trait]
impl HistoryApi for BackendClient {
    async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let url = self.endpoint(&["api", "models"])?;

        let response = self
            .client
            .get(url)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        tracing::debug!(count = body.models.len(), "Listed models");
        Ok(body.models)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let url = self.endpoint(&["api", "chat", "sessions"])?;

        let response = self
            .client
            .get(url)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body: ListSessionsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        tracing::debug!(count = body.sessions.len(), "Listed sessions");
        Ok(body.sessions)
    }

    async fn get_session(&self, session_id: &SessionId) -> Result<SessionHistory, ClientError> {
        let url = self.endpoint(&["api", "chat", "session", session_id.as_str()])?;

        let response = self
            .client
            .get(url)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let history: SessionHistory = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        tracing::debug!(
            session_id = %session_id,
            messages = history.messages.len(),
            "Fetched session history"
        );
        Ok(history)
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "chat", "session", session_id.as_str()])?;

        let response = self
            .client
            .delete(url)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(session_id = %session_id, "Session already gone");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        tracing::debug!(session_id = %session_id, "Deleted session");
        Ok(())
    }
}

#[async_trait]
impl Transport for BackendClient {
    async fn open(&self, request: &AgentRequest) -> Result<ByteStream, TransportError> {
        let url = self
            .endpoint(&["api", "agent"])
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(
            agent = %request.agent,
            model = %request.model,
            session_id = ?request.session_id.as_ref().map(SessionId::as_str),
            "Opening agent stream"
        );

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Read(e.to_string())));
        Ok(Box::pin(body))
    }
}
