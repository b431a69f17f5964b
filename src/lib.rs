// Public modules
pub mod backend;
pub mod cancel;
pub mod client;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod decode;
pub mod error;
pub mod fallback;
pub mod markup;
pub mod observability;
pub mod observer;
pub mod render;
pub mod store;
pub mod stream;
pub mod types;

// Re-exports
pub use backend::{ByteStream, ChatBackend};
pub use cancel::{CancellationController, RequestHandle};
pub use client::ChatClient;
pub use config::{ChatArgs, ChatConfig};
pub use conversation::{Conversation, SendOutcome};
pub use decode::{Utf8Decoder, decode_text};
pub use error::{Error, Result};
pub use fallback::{FallbackDispatcher, FallbackOutcome};
pub use observability::register_biometrics;
pub use observer::{NullObserver, ReplyObserver, StderrObserver};
pub use store::{Session, SessionId, SessionStore, SharedStore};
pub use stream::{ReplyStreamConsumer, StreamOutcome};
pub use types::*;
