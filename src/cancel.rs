//! Tracking and cancelling the in-flight request.
//!
//! Only one request may be outstanding at a time across all sessions.  The controller holds a
//! single slot: [`CancellationController::try_begin`] fills it or reports busy, and
//! [`CancellationController::cancel_active`] signals whatever occupies it.  Switching sessions
//! and tearing the client down both cancel the occupant regardless of which session it serves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::store::SessionId;

/// Handle for one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    session_id: SessionId,
    ticket: u64,
    token: CancellationToken,
}

impl RequestHandle {
    /// The session the request writes its reply into.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The token the request watches for cancellation.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Single-slot registry of the in-flight request.
#[derive(Debug, Default)]
pub struct CancellationController {
    slot: Mutex<Option<RequestHandle>>,
    next_ticket: AtomicU64,
}

impl CancellationController {
    /// Creates an empty controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh handle for `session_id` without registering it.
    pub fn handle_for(&self, session_id: SessionId) -> RequestHandle {
        RequestHandle {
            session_id,
            ticket: self.next_ticket.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        }
    }

    /// Registers `handle` as the in-flight request, replacing any previous registration.
    pub fn register(&self, handle: RequestHandle) {
        *self.lock() = Some(handle);
    }

    /// Registers a new handle for `session_id` unless a request is already in flight.
    pub fn try_begin(&self, session_id: SessionId) -> Option<RequestHandle> {
        let mut slot = self.lock();
        if slot.is_some() {
            return None;
        }
        let handle = self.handle_for(session_id);
        *slot = Some(handle.clone());
        Some(handle)
    }

    /// Signals the in-flight request, if any, to stop.  Returns the session it served.
    ///
    /// The slot stays occupied until the request settles and calls [`Self::release`], so a
    /// new request cannot start while the old one is still winding down.
    pub fn cancel_active(&self) -> Option<SessionId> {
        let slot = self.lock();
        let handle = slot.as_ref()?;
        handle.token.cancel();
        Some(handle.session_id)
    }

    /// Clears the slot if it still holds `handle`.
    pub fn release(&self, handle: &RequestHandle) -> bool {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(current) if current.ticket == handle.ticket => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// The session served by the in-flight request, if any.
    pub fn in_flight(&self) -> Option<SessionId> {
        self.lock().as_ref().map(|h| h.session_id)
    }

    /// Returns true while a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<RequestHandle>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
