use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One message in a chat transcript.
///
/// Serializes as `{"sender": ..., "text": ...}`.  The pending flag is client-local state and
/// never crosses the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    /// Who wrote the turn.
    #[serde(rename = "sender")]
    pub role: Role,

    /// The text of the turn.
    pub text: String,

    #[serde(skip)]
    pending: bool,
}

impl Turn {
    /// Creates a finished user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            pending: false,
        }
    }

    /// Creates a finished assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            pending: false,
        }
    }

    /// Creates the empty assistant placeholder that a reply streams into.
    pub fn pending_reply() -> Self {
        Self {
            role: Role::Assistant,
            text: String::new(),
            pending: true,
        }
    }

    /// Returns true while this is an assistant turn still being filled in.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns true if this turn was authored by the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns true if this turn was authored by the assistant.
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub(crate) fn settle(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_pending() {
        let turn = Turn::pending_reply();
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"sender":"bot","text":""}"#);
    }

    #[test]
    fn deserialized_turns_are_settled() {
        let turn: Turn = serde_json::from_str(r#"{"sender":"ai","text":"hi"}"#).unwrap();
        assert!(turn.is_assistant());
        assert!(!turn.is_pending());
    }
}
