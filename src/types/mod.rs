// Public modules
pub mod chat_request;
pub mod chat_response;
pub mod display_block;
pub mod request_snapshot;
pub mod role;
pub mod turn;

// Re-exports
pub use chat_request::ChatRequest;
pub use chat_response::{ChatResponse, MISSING_REPLY_PLACEHOLDER};
pub use display_block::{BlockKind, DisplayBlock, Inline, inline_text};
pub use request_snapshot::RequestSnapshot;
pub use role::Role;
pub use turn::Turn;
