//! Transport seam for streamed agent responses.
//!
//! The stream orchestrator only needs "send this request, give me the body as
//! a sequence of byte chunks". [`BackendClient`](crate::BackendClient) does
//! that over HTTP; tests script it.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::TransportError;
use crate::types::AgentRequest;

/// Response body as a sequence of chunks with arbitrary boundaries.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Opens response streams.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response body stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the backend rejects it.
    async fn open(&self, request: &AgentRequest) -> Result<ByteStream, TransportError>;
}
