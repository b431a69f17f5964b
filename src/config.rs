//! Configuration for the chat client.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved configuration that
//! the client, the store and the reply pipeline are built from.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::store::DEFAULT_GREETING;

/// Default location of the answering service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// Default deadline for one-shot requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default deadline for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Text written into a reply when the one-shot fallback fails too.
pub const DEFAULT_APOLOGY: &str = "Sorry, something went wrong. Please try again.";

/// Command-line arguments for the chatterbox tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the answering service.
    #[arrrg(optional, "Service base URL (default: http://localhost:8000/)", "URL")]
    pub base_url: Option<String>,

    /// Deadline for one-shot requests.
    #[arrrg(optional, "One-shot request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Greeting that opens every new session.
    #[arrrg(optional, "Greeting shown at the top of new chats", "TEXT")]
    pub greeting: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log transport diagnostics to stderr.
    #[arrrg(flag, "Log stream and fallback diagnostics to stderr")]
    pub verbose: bool,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the answering service.
    pub base_url: String,

    /// Deadline for one-shot requests.
    pub timeout: Duration,

    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,

    /// Greeting seeded into every new session.
    pub greeting: String,

    /// Text written into a reply when every attempt failed.
    pub apology: String,

    /// Whether requests carry a `session_id` for the service to key its own history on.
    pub send_session_ids: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log transport diagnostics.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            greeting: DEFAULT_GREETING.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
            send_session_ids: false,
            use_color: true,
            verbose: false,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the one-shot timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Sets the greeting.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Sets the apology text.
    pub fn with_apology(mut self, apology: impl Into<String>) -> Self {
        self.apology = apology.into();
        self
    }

    /// Sets whether requests carry a session id.
    pub fn with_session_ids(mut self, enabled: bool) -> Self {
        self.send_session_ids = enabled;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets verbose logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            base_url: args
                .base_url
                .or_else(|| std::env::var(crate::client::BASE_URL_ENV).ok())
                .unwrap_or(defaults.base_url),
            timeout: args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            greeting: args.greeting.unwrap_or(defaults.greeting),
            use_color: !args.no_color,
            verbose: args.verbose,
            ..ChatConfig::new()
        }
    }
}
