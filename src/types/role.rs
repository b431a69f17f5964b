use serde::{Deserialize, Serialize};

/// Author of a turn.
///
/// On the wire the assistant is called `"bot"`.  The answering service records assistant turns
/// as `"ai"`, so that spelling is accepted when deserializing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A turn typed by the person using the client.
    #[serde(rename = "user")]
    User,

    /// A turn produced by the answering service.
    #[serde(rename = "bot", alias = "ai")]
    Assistant,
}

impl Role {
    /// Returns the wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "bot",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""bot""#);
    }

    #[test]
    fn ai_alias() {
        let role: Role = serde_json::from_str(r#""ai""#).unwrap();
        assert_eq!(role, Role::Assistant);
        let role: Role = serde_json::from_str(r#""bot""#).unwrap();
        assert_eq!(role, Role::Assistant);
    }
}
