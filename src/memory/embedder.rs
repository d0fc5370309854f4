//! Text embedders.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;
use tracing::info;

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Local `fastembed` model (BGE-Small-En-V1.5), loaded lazily.
pub struct FastEmbedder {
    model: Arc<Mutex<Option<TextEmbedding>>>,
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model", &"BGESmallENV15")
            .finish()
    }
}

impl Default for FastEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl FastEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: Arc::new(Mutex::new(None)),
        }
    }

    /// Load the model, downloading it on first use.
    pub async fn initialize(&self) -> Result<()> {
        let mut model_guard = self.model.lock().await;
        if model_guard.is_none() {
            info!(name: "memory.embedder.loading", "Initializing fastembed model (BGE-Small-En-V1.5)");
            let options = InitOptions::new(EmbeddingModel::BGESmallENV15);
            let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
                .await
                .context("embedder init task panicked")??;
            *model_guard = Some(model);
        }
        Ok(())
    }
}

/// Run `f` on the blocking pool with the model taken out of `slot`.
///
/// The model goes back into the slot even when `f` panics, so one bad call
/// cannot leave the embedder uninitialized.
async fn with_model<M, R, F>(slot: &Mutex<Option<M>>, f: F) -> Result<R>
where
    M: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut M) -> R + Send + 'static,
{
    let mut guard = slot.lock().await;
    let mut model = guard.take().context("FastEmbedder not initialized")?;

    let (outcome, model) = tokio::task::spawn_blocking(move || {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| f(&mut model)));
        (outcome, model)
    })
    .await
    .context("embedder task was cancelled")?;

    *guard = Some(model);
    outcome.map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        anyhow::anyhow!("embedding call panicked: {message}")
    })
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        with_model(&self.model, move |model: &mut TextEmbedding| model.embed(texts, None))
            .await?
            .map_err(|e| anyhow::anyhow!(e))
    }
}
