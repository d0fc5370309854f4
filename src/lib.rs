//! KaddaConnect community service.
//!
//! A church community backend: social feed, prayer requests, events, a
//! sermon archive with personal notes, a member directory, and an LLM
//! assistant with per-member long-term memory.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP/JSON API, one [`workspace::Workspace`] per client session
//! - **Flows**: schema-validated wrappers around single model calls
//! - **Memory**: per-member vector recall backed by local embeddings
//!
//! # Modules
//!
//! - [`session`]: conversation threads and the per-session conversation store
//! - [`community`]: profiles, posts, prayer requests, events, sermon notes
//! - [`workspace`]: session-scoped state and the session registry
//! - [`flows`]: assistant chat, sermon summary, verse explanation, sermon search
//! - [`llm`]: hosted model client
//! - [`memory`]: long-term memory
//! - [`bible`]: passage lookup
//! - [`auth`]: persisted sign-in state

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod auth;
pub mod bible;
pub mod community;
pub mod config;
pub mod error;
pub mod flows;
pub mod llm;
pub mod memory;
pub mod server;
pub mod sermons;
pub mod session;
pub mod workspace;

use std::sync::Arc;

use crate::bible::BibleClient;
use crate::config::AppConfig;
use crate::llm::ModelClient;
use crate::memory::LongTermMemory;
use crate::sermons::Sermon;
use crate::workspace::WorkspaceRegistry;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Per-session workspaces.
    pub workspaces: WorkspaceRegistry,
    /// Model used by every flow.
    pub model: Arc<dyn ModelClient>,
    /// Long-term memory; `None` when disabled or the embedder failed to load.
    pub memory: Option<Arc<dyn LongTermMemory>>,
    pub bible: Arc<BibleClient>,
    /// Read-only sermon archive shared by all workspaces.
    pub sermons: Arc<Vec<Sermon>>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
