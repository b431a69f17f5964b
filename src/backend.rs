//! The transport seam between the reply pipeline and the answering service.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::Result;
use crate::types::{ChatRequest, ChatResponse};

/// A raw reply body, delivered in the order the service wrote it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Something that can answer a [`ChatRequest`].
///
/// [`crate::ChatClient`] implements this over HTTP.  Tests implement it in memory.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Opens a streaming reply.
    ///
    /// Fails when the service cannot be reached, answers with a non-success status, or sends no
    /// body.  Errors while the body is being read are reported as items of the stream.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream>;

    /// Requests a complete reply in one response.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
