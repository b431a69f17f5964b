//! Hooks into the reply pipeline.
//!
//! The pipeline reports what it does through a [`ReplyObserver`].  A terminal front end uses
//! the hooks to echo text as it arrives; tests use them to count events.  Every hook has a
//! no-op default.

use crate::conversation::SendOutcome;
use crate::error::Error;
use crate::store::SessionId;

/// Observer for reply pipeline events.
pub trait ReplyObserver: Send + Sync {
    /// A request for `session_id` has been admitted.
    fn on_request(&self, session_id: SessionId, question: &str) {
        _ = (session_id, question);
    }

    /// A piece of streamed text was appended to the reply.
    fn on_chunk(&self, session_id: SessionId, text: &str) {
        _ = (session_id, text);
    }

    /// The streaming attempt failed and the one-shot fallback is about to run.
    fn on_stream_unavailable(&self, session_id: SessionId, error: &Error) {
        _ = (session_id, error);
    }

    /// The one-shot fallback produced `text`, which replaced the reply.
    fn on_fallback_reply(&self, session_id: SessionId, text: &str) {
        _ = (session_id, text);
    }

    /// The one-shot fallback failed too.
    fn on_fallback_failure(&self, session_id: SessionId, error: &Error) {
        _ = (session_id, error);
    }

    /// The request was cancelled and its reply settled as-is.
    fn on_cancelled(&self, session_id: SessionId) {
        _ = session_id;
    }

    /// A send was refused because another request is in flight.
    fn on_busy(&self) {}

    /// The request has settled.
    fn on_outcome(&self, session_id: SessionId, outcome: SendOutcome) {
        _ = (session_id, outcome);
    }
}

/// An observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ReplyObserver for NullObserver {}

/// An observer that writes transport diagnostics to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrObserver;

impl ReplyObserver for StderrObserver {
    fn on_stream_unavailable(&self, session_id: SessionId, error: &Error) {
        eprintln!("[chat {session_id}] stream unavailable, falling back: {error}");
    }

    fn on_fallback_failure(&self, session_id: SessionId, error: &Error) {
        eprintln!("[chat {session_id}] fallback failed: {error}");
    }

    fn on_cancelled(&self, session_id: SessionId) {
        eprintln!("[chat {session_id}] request cancelled");
    }

    fn on_busy(&self) {
        eprintln!("a reply is still in progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_noops() {
        let observer = NullObserver;
        observer.on_request(1, "hi");
        observer.on_chunk(1, "text");
        observer.on_stream_unavailable(1, &Error::api(500, "boom"));
        observer.on_cancelled(1);
        observer.on_busy();
        observer.on_outcome(1, SendOutcome::Completed);
    }
}
