//! Consuming a streamed reply.
//!
//! [`ReplyStreamConsumer`] opens the streaming endpoint, decodes the body incrementally and
//! appends each decoded piece to the pending reply.  It never retries: a failure is reported as
//! [`StreamOutcome::Unavailable`] and left to the caller, which owns the fallback decision.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::backend::ChatBackend;
use crate::decode::decode_text;
use crate::error::Error;
use crate::observability::{
    CANCEL_OBSERVED, STREAM_BYTES, STREAM_CHUNKS, STREAM_COMPLETED, STREAM_OPENED, STREAM_TTFB,
    STREAM_UNAVAILABLE,
};
use crate::observer::ReplyObserver;
use crate::store::{SessionId, SharedStore, lock_store};
use crate::types::ChatRequest;

/// How a streaming attempt ended.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    /// The body ended normally.
    Completed,
    /// The cancellation token fired first.  Text received so far stays in the reply.
    Cancelled,
    /// The stream could not be opened or broke off.
    Unavailable(Error),
}

/// Streams one reply into the store.
pub struct ReplyStreamConsumer {
    backend: Arc<dyn ChatBackend>,
    store: SharedStore,
    observer: Arc<dyn ReplyObserver>,
}

impl ReplyStreamConsumer {
    /// Creates a consumer writing into `store`.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: SharedStore,
        observer: Arc<dyn ReplyObserver>,
    ) -> Self {
        Self {
            backend,
            store,
            observer,
        }
    }

    /// Streams the reply to `request` into the pending reply of `session_id`.
    ///
    /// Decoded pieces are appended in arrival order.  The token is checked while the request is
    /// being opened and before every piece; once it fires nothing more is appended.
    pub async fn consume(
        &self,
        session_id: SessionId,
        request: &ChatRequest,
        token: &CancellationToken,
    ) -> StreamOutcome {
        let start = Instant::now();
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return self.cancelled(),
            opened = self.backend.open_stream(request) => opened,
        };
        let body = match opened {
            Ok(body) => body,
            Err(err) => return self.unavailable(err),
        };
        STREAM_OPENED.click();

        let mut pieces = std::pin::pin!(decode_text(body));
        let mut first = true;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return self.cancelled(),
                next = pieces.next() => next,
            };
            match next {
                Some(Ok(text)) => {
                    if first {
                        STREAM_TTFB.add(start.elapsed().as_secs_f64());
                        first = false;
                    }
                    STREAM_CHUNKS.click();
                    STREAM_BYTES.count(text.len() as u64);
                    if lock_store(&self.store).append_to_pending_reply(session_id, &text) {
                        self.observer.on_chunk(session_id, &text);
                    }
                }
                Some(Err(err)) => return self.unavailable(err),
                None => {
                    STREAM_COMPLETED.click();
                    return StreamOutcome::Completed;
                }
            }
        }
    }

    fn cancelled(&self) -> StreamOutcome {
        CANCEL_OBSERVED.click();
        StreamOutcome::Cancelled
    }

    fn unavailable(&self, err: Error) -> StreamOutcome {
        STREAM_UNAVAILABLE.click();
        StreamOutcome::Unavailable(err)
    }
}
