use serde::{Deserialize, Serialize};

use crate::types::Turn;

/// Body posted to both `/chat-stream` and `/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The text of the user turn being answered.
    pub question: String,

    /// Transcript up to and including the user turn being answered.
    pub history: Vec<Turn>,

    /// Optional conversation key understood by the answering service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Creates a new request.
    pub fn new(question: impl Into<String>, history: Vec<Turn>) -> Self {
        Self {
            question: question.into(),
            history,
            session_id: None,
        }
    }

    /// Attaches a conversation key.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
