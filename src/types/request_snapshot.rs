use std::sync::Arc;

use crate::store::SessionId;
use crate::types::{ChatRequest, Turn};

/// The transcript as it stood when a user turn was sent.
///
/// Holds every turn up to and including the new user turn, but not the empty placeholder that
/// follows it.  The snapshot is frozen: later edits to the live transcript never reach it, so
/// the stream attempt and its fallback post identical history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    session_id: SessionId,
    turns: Arc<[Turn]>,
}

impl RequestSnapshot {
    /// Freezes the given turns for the given session.
    pub fn new(session_id: SessionId, turns: Vec<Turn>) -> Self {
        Self {
            session_id,
            turns: turns.into(),
        }
    }

    /// The session the snapshot was taken from.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The frozen turns.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The text of the newest user turn, which is the question being asked.
    pub fn question(&self) -> &str {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.is_user())
            .map(|turn| turn.text.as_str())
            .unwrap_or("")
    }

    /// Builds the request body for either endpoint.
    pub fn to_request(&self) -> ChatRequest {
        ChatRequest::new(self.question(), self.turns.to_vec())
    }
}
