//! The one-shot retry that follows a failed stream.

use std::sync::Arc;

use crate::backend::ChatBackend;
use crate::error::Error;
use crate::observability::{FALLBACK_FAILURES, FALLBACK_REQUESTS};
use crate::observer::ReplyObserver;
use crate::store::{SessionId, SharedStore, lock_store};
use crate::types::ChatRequest;

/// How the fallback ended.
#[derive(Debug, Clone)]
pub enum FallbackOutcome {
    /// The reply was replaced with the service's answer.
    Completed,
    /// The request failed; the reply was settled with the apology unless it already held text.
    Failed(Error),
}

/// Issues exactly one one-shot request for a reply whose stream failed.
///
/// The dispatcher is neither cancellable nor retried: whatever it gets back settles the reply.
pub struct FallbackDispatcher {
    backend: Arc<dyn ChatBackend>,
    store: SharedStore,
    observer: Arc<dyn ReplyObserver>,
    apology: String,
}

impl FallbackDispatcher {
    /// Creates a dispatcher that writes `apology` when the request fails.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: SharedStore,
        observer: Arc<dyn ReplyObserver>,
        apology: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            observer,
            apology: apology.into(),
        }
    }

    /// Posts `request` once and settles the pending reply of `session_id` with the result.
    pub async fn dispatch(&self, session_id: SessionId, request: &ChatRequest) -> FallbackOutcome {
        FALLBACK_REQUESTS.click();
        match self.backend.complete(request).await {
            Ok(response) => {
                let text = response.reply_text();
                lock_store(&self.store).set_reply_full(session_id, text);
                self.observer.on_fallback_reply(session_id, text);
                FallbackOutcome::Completed
            }
            Err(err) => {
                FALLBACK_FAILURES.click();
                lock_store(&self.store).finalize_reply_with_error(session_id, &self.apology);
                self.observer.on_fallback_failure(session_id, &err);
                FallbackOutcome::Failed(err)
            }
        }
    }
}
