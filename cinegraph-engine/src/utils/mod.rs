//! Utility modules for cinegraph-engine

pub mod retry;
pub mod text;

pub use retry::retry_with_backoff;
pub use text::{is_stop_word, normalize, tokenize};
