//! Long-term member memory.
//!
//! Snippets are embedded and stored per user; retrieval embeds the query
//! and returns the top-K snippets by cosine similarity, considering only
//! snippets owned by the requesting user. Each user keeps at most a fixed
//! number of snippets; the oldest is evicted first. Failures are reported
//! in the result records, never raised.

mod embedder;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

pub use embedder::{Embedder, FastEmbedder};

/// Snippets kept per user when no limit is configured.
pub const DEFAULT_MAX_SNIPPETS_PER_USER: usize = 500;

/// Outcome of [`LongTermMemory::store`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreResult {
    fn stored(id: String) -> Self {
        Self {
            success: true,
            snippet_id: Some(id),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            snippet_id: None,
            error: Some(error.into()),
        }
    }
}

/// A retrieved snippet and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetMatch {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// Outcome of [`LongTermMemory::retrieve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResult {
    /// Matched snippets rendered as a bullet list for prompt augmentation.
    pub retrieved_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_snippets: Option<Vec<SnippetMatch>>,
}

/// Per-user snippet memory.
#[async_trait]
pub trait LongTermMemory: Send + Sync + std::fmt::Debug {
    async fn store(&self, user_id: &str, text: &str, metadata: serde_json::Value) -> StoreResult;

    /// Top `limit` snippets owned by `user_id`, most similar first.
    async fn retrieve(&self, user_id: &str, query: &str, limit: usize) -> RetrieveResult;
}

#[derive(Debug, Clone)]
struct Snippet {
    id: String,
    text: String,
    metadata: serde_json::Value,
    embedding: Vec<f32>,
}

/// In-process vector index over an [`Embedder`], bucketed by user.
#[derive(Debug)]
pub struct VectorMemory {
    embedder: Arc<dyn Embedder>,
    max_per_user: usize,
    snippets: RwLock<HashMap<String, VecDeque<Snippet>>>,
}

impl VectorMemory {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_limit(embedder, DEFAULT_MAX_SNIPPETS_PER_USER)
    }

    /// An index keeping at most `max_per_user` snippets per user (at least one).
    #[must_use]
    pub fn with_limit(embedder: Arc<dyn Embedder>, max_per_user: usize) -> Self {
        Self {
            embedder,
            max_per_user: max_per_user.max(1),
            snippets: RwLock::new(HashMap::new()),
        }
    }

    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embedder
            .embed(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No embedding generated"))
    }

    pub async fn len(&self) -> usize {
        self.snippets.read().await.values().map(VecDeque::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LongTermMemory for VectorMemory {
    async fn store(&self, user_id: &str, text: &str, metadata: serde_json::Value) -> StoreResult {
        if user_id.trim().is_empty() {
            return StoreResult::failed("userId must not be empty");
        }
        if text.trim().is_empty() {
            return StoreResult::failed("text must not be empty");
        }

        let embedding = match self.embed_one(text).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(name: "memory.store.failed", error = %e, "Embedding failed");
                return StoreResult::failed(format!("Embedding failed: {e}"));
            }
        };

        let id = Uuid::new_v4().to_string();
        let mut snippets = self.snippets.write().await;
        let bucket = snippets.entry(user_id.to_string()).or_default();
        bucket.push_back(Snippet {
            id: id.clone(),
            text: text.trim().to_string(),
            metadata,
            embedding,
        });
        let mut evicted = 0usize;
        while bucket.len() > self.max_per_user {
            bucket.pop_front();
            evicted += 1;
        }
        drop(snippets);

        tracing::debug!(name: "memory.stored", user_id = %user_id, snippet_id = %id, evicted, "Snippet stored");
        StoreResult::stored(id)
    }

    async fn retrieve(&self, user_id: &str, query: &str, limit: usize) -> RetrieveResult {
        if limit == 0 || query.trim().is_empty() {
            return RetrieveResult::default();
        }

        let query_vec = match self.embed_one(query).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(name: "memory.retrieve.failed", error = %e, "Embedding failed");
                return RetrieveResult::default();
            }
        };

        let snippets = self.snippets.read().await;
        let mut matches: Vec<SnippetMatch> = snippets
            .get(user_id)
            .into_iter()
            .flatten()
            .map(|s| SnippetMatch {
                id: s.id.clone(),
                text: s.text.clone(),
                score: cosine_similarity(&query_vec, &s.embedding),
                metadata: s.metadata.clone(),
            })
            .collect();
        drop(snippets);

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(limit);

        let retrieved_context = matches
            .iter()
            .map(|m| format!("- {}", m.text))
            .collect::<Vec<_>>()
            .join("\n");

        RetrieveResult {
            retrieved_context,
            debug_snippets: Some(matches),
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude or the
/// lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
