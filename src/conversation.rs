//! The multi-session chat client.
//!
//! [`Conversation`] owns the session store and the single in-flight slot, and runs each user
//! turn through the reply pipeline:
//!
//! ```text
//! idle -> streaming -> completed | cancelled
//!                   -> stream failed -> fallback completed | fallback failed
//! ```
//!
//! Every terminal state settles the pending reply and frees the slot.

use std::sync::Arc;
use std::time::Instant;

use crate::backend::ChatBackend;
use crate::cancel::{CancellationController, RequestHandle};
use crate::config::ChatConfig;
use crate::fallback::{FallbackDispatcher, FallbackOutcome};
use crate::observability::{CANCEL_REQUESTS, SEND_BUSY, SEND_DURATION, SEND_REQUESTS};
use crate::observer::{NullObserver, ReplyObserver};
use crate::store::{Session, SessionId, SessionStore, SharedStore, lock_store};
use crate::stream::{ReplyStreamConsumer, StreamOutcome};
use crate::types::RequestSnapshot;

/// The terminal state of one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Refused because another request was in flight.  Nothing changed.
    Busy,
    /// Nothing to send: empty input or an unknown session.
    Ignored,
    /// The stream ran to completion.
    Completed,
    /// The request was abandoned.  The reply keeps whatever text had arrived.
    Cancelled,
    /// The stream failed and the one-shot reply replaced it.
    FallbackCompleted,
    /// The stream and the one-shot request both failed.
    FallbackFailed,
}

impl SendOutcome {
    /// Returns true if the outcome left a settled reply behind.
    pub fn is_settled(&self) -> bool {
        !matches!(self, SendOutcome::Busy | SendOutcome::Ignored)
    }
}

/// A chat client holding any number of sessions.
///
/// Cloning is cheap and every clone drives the same sessions, which is how a front end hands a
/// send to a background task while keeping the ability to cancel it.
#[derive(Clone)]
pub struct Conversation {
    store: SharedStore,
    cancel: Arc<CancellationController>,
    backend: Arc<dyn ChatBackend>,
    observer: Arc<dyn ReplyObserver>,
    consumer: Arc<ReplyStreamConsumer>,
    fallback: Arc<FallbackDispatcher>,
    config: Arc<ChatConfig>,
}

impl Conversation {
    /// Creates a client with one fresh, active session.
    pub fn new(backend: Arc<dyn ChatBackend>, config: ChatConfig) -> Self {
        let mut store = SessionStore::new(config.greeting.clone());
        store.create_session();
        Self::assemble(
            store.into_shared(),
            Arc::new(CancellationController::new()),
            backend,
            Arc::new(NullObserver),
            Arc::new(config),
        )
    }

    /// Replaces the observer notified of pipeline events.
    pub fn with_observer(self, observer: Arc<dyn ReplyObserver>) -> Self {
        Self::assemble(self.store, self.cancel, self.backend, observer, self.config)
    }

    fn assemble(
        store: SharedStore,
        cancel: Arc<CancellationController>,
        backend: Arc<dyn ChatBackend>,
        observer: Arc<dyn ReplyObserver>,
        config: Arc<ChatConfig>,
    ) -> Self {
        let consumer = Arc::new(ReplyStreamConsumer::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&observer),
        ));
        let fallback = Arc::new(FallbackDispatcher::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&observer),
            config.apology.clone(),
        ));
        Self {
            store,
            cancel,
            backend,
            observer,
            consumer,
            fallback,
            config,
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The shared session store.
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    /// All sessions in creation order.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        lock_store(&self.store).sessions()
    }

    /// Looks up a session.
    pub fn session(&self, id: SessionId) -> Option<Arc<Session>> {
        lock_store(&self.store).session(id)
    }

    /// The active session.
    pub fn active(&self) -> Option<Arc<Session>> {
        lock_store(&self.store).active()
    }

    /// The id of the active session.
    pub fn active_id(&self) -> Option<SessionId> {
        lock_store(&self.store).active_id()
    }

    /// Number of pending replies in a session; zero for unknown sessions.
    pub fn pending_count(&self, id: SessionId) -> usize {
        self.session(id).map_or(0, |s| s.pending_count())
    }

    /// Returns true while a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.cancel.is_busy()
    }

    /// Creates a session and makes it active, abandoning any in-flight request.
    pub fn new_session(&self) -> SessionId {
        self.cancel_active();
        lock_store(&self.store).create_session()
    }

    /// Makes `id` the active session.
    ///
    /// Switching away from the active session abandons any in-flight request.  Returns false
    /// and changes nothing when `id` does not exist.
    pub fn select_session(&self, id: SessionId) -> bool {
        let mut store = lock_store(&self.store);
        if store.session(id).is_none() {
            return false;
        }
        if store.active_id() != Some(id) {
            self.cancel_active();
        }
        store.select_session(id)
    }

    /// Signals the in-flight request to stop.  Returns the session it was serving.
    pub fn cancel_active(&self) -> Option<SessionId> {
        let cancelled = self.cancel.cancel_active();
        if cancelled.is_some() {
            CANCEL_REQUESTS.click();
        }
        cancelled
    }

    /// Abandons any in-flight request before the client goes away.
    pub fn shutdown(&self) {
        self.cancel_active();
    }

    /// Sends `text` as a user turn in the active session and waits for the reply to settle.
    ///
    /// Surrounding whitespace is trimmed; empty input is ignored.  The in-flight slot is taken
    /// before anything is appended, so a refused send leaves the transcript untouched.
    pub async fn submit(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(session_id) = self.active_id() else {
            return SendOutcome::Ignored;
        };
        let Some(handle) = self.begin(session_id) else {
            return SendOutcome::Busy;
        };
        let snapshot = lock_store(&self.store).append_user_turn(session_id, text);
        let Some(snapshot) = snapshot else {
            self.cancel.release(&handle);
            return SendOutcome::Ignored;
        };
        self.run(handle, snapshot).await
    }

    /// Streams the reply to `snapshot` into the pending reply of `session_id`.
    ///
    /// The caller must already have appended the user turn, typically through
    /// [`SessionStore::append_user_turn`].  When another request is in flight this returns
    /// [`SendOutcome::Busy`] without touching the network, and the turn the snapshot was taken
    /// for is withdrawn so the session can be sent to again.
    pub async fn send(&self, session_id: SessionId, snapshot: RequestSnapshot) -> SendOutcome {
        let Some(handle) = self.begin(session_id) else {
            lock_store(&self.store).withdraw_user_turn(session_id, &snapshot);
            return SendOutcome::Busy;
        };
        self.run(handle, snapshot).await
    }

    fn begin(&self, session_id: SessionId) -> Option<RequestHandle> {
        let handle = self.cancel.try_begin(session_id);
        if handle.is_none() {
            SEND_BUSY.click();
            self.observer.on_busy();
        }
        handle
    }

    async fn run(&self, handle: RequestHandle, snapshot: RequestSnapshot) -> SendOutcome {
        let start = Instant::now();
        SEND_REQUESTS.click();
        let session_id = handle.session_id();
        let mut request = snapshot.to_request();
        if self.config.send_session_ids {
            request = request.with_session_id(session_id.to_string());
        }
        self.observer.on_request(session_id, snapshot.question());

        let outcome = match self
            .consumer
            .consume(session_id, &request, handle.token())
            .await
        {
            StreamOutcome::Completed => {
                lock_store(&self.store).finish_reply(session_id);
                SendOutcome::Completed
            }
            StreamOutcome::Unavailable(err) if !handle.is_cancelled() => {
                self.observer.on_stream_unavailable(session_id, &err);
                match self.fallback.dispatch(session_id, &request).await {
                    FallbackOutcome::Completed => SendOutcome::FallbackCompleted,
                    FallbackOutcome::Failed(_) => SendOutcome::FallbackFailed,
                }
            }
            // The token fired before the failure surfaced: an abandoned request never falls back.
            StreamOutcome::Cancelled | StreamOutcome::Unavailable(_) => {
                lock_store(&self.store).finish_reply(session_id);
                self.observer.on_cancelled(session_id);
                SendOutcome::Cancelled
            }
        };

        self.cancel.release(&handle);
        SEND_DURATION.add(start.elapsed().as_secs_f64());
        self.observer.on_outcome(session_id, outcome);
        outcome
    }
}
