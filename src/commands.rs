//! Slash command parsing for the chat binary.
//!
//! Input starting with `/` controls the client instead of being sent to the service.

use crate::store::SessionId;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Start a new session and make it active.
    New,

    /// Make the given session active.
    Switch(SessionId),

    /// List all sessions.
    List,

    /// Reprint the active session's transcript.
    Show,

    /// Cancel the in-flight request.
    Cancel,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it should be sent as a
/// message.
///
/// # Examples
///
/// ```
/// # use chatterbox::commands::{parse_command, ChatCommand};
/// assert_eq!(parse_command("/switch 2"), Some(ChatCommand::Switch(2)));
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "switch" | "s" => match argument {
            Some(arg) => match arg.parse::<SessionId>() {
                Ok(id) => ChatCommand::Switch(id),
                Err(_) => ChatCommand::Invalid("/switch expects a session number".to_string()),
            },
            None => ChatCommand::Invalid("/switch requires a session number".to_string()),
        },
        "list" | "ls" => ChatCommand::List,
        "show" => ChatCommand::Show,
        "cancel" => ChatCommand::Cancel,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat
  /switch <n>            Switch to chat number n
  /list                  List chats
  /show                  Reprint the current chat
  /cancel                Stop the reply in progress
  /help                  Show this help message
  /quit                  Exit"#
}
