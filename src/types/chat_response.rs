use serde::{Deserialize, Serialize};

/// Text installed when a one-shot response carries no `response` field.
pub const MISSING_REPLY_PLACEHOLDER: &str = "…";

/// Body returned by the one-shot `/chat` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// The complete reply.
    #[serde(default)]
    pub response: Option<String>,
}

impl ChatResponse {
    /// Creates a response carrying the given reply.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    /// Returns the reply, or the placeholder ellipsis when the field was absent.
    pub fn reply_text(&self) -> &str {
        self.response.as_deref().unwrap_or(MISSING_REPLY_PLACEHOLDER)
    }
}
