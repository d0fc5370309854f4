//! Conversation thread management.
//!
//! Each client session owns one [`ConversationStore`]: the saved threads,
//! the active thread pointer, and a transient draft for the unsaved
//! "new conversation". All operations are synchronous and in-memory;
//! invalid input is reported through return values.
//!
//! # Example
//!
//! ```rust
//! use kadda_connect::session::{ConversationStore, Message};
//!
//! let mut store = ConversationStore::new();
//! let id = store.save_new(vec![Message::user("Hello!")], "Greeting");
//!
//! assert_eq!(store.active_id(), Some(id.as_str()));
//! assert!(store.rename_conversation(&id, "   ").is_err());
//! ```

mod thread;

pub use thread::{
    AppendOutcome, ConversationError, ConversationStore, ConversationThread, Message,
    MessageStatus, Sender, ThreadSummary, ThreadView,
};
