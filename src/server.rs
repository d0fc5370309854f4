use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::api;
use crate::auth::{FileStore, KeyValueStore};
use crate::bible::BibleClient;
use crate::config::AppConfig;
use crate::llm::{ChatCompletionsClient, LlmSettings, ModelClient};
use crate::memory::{FastEmbedder, LongTermMemory, VectorMemory};
use crate::sermons::placeholder_catalog;
use crate::workspace::WorkspaceRegistry;

/// Stand-in for "no timeout" that keeps the middleware stack uniform.
const DISABLED_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// The full application: API routes plus tracing, CORS, body limit, and
/// request timeout.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = match state.config.server.request_timeout_secs {
        0 => DISABLED_TIMEOUT,
        secs => Duration::from_secs(secs),
    };
    let body_limit = state.config.server.body_limit_bytes;

    api::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .with_state(state)
}

async fn init_memory(config: &AppConfig) -> Option<Arc<dyn LongTermMemory>> {
    if !config.memory.enabled {
        info!(name: "memory.disabled", "Long-term memory disabled by configuration");
        return None;
    }

    let embedder = Arc::new(FastEmbedder::new());
    match embedder.initialize().await {
        Ok(()) => {
            info!(name: "memory.ready", "Long-term memory enabled");
            Some(Arc::new(VectorMemory::with_limit(
                embedder,
                config.memory.max_snippets_per_user,
            )))
        }
        Err(e) => {
            tracing::error!(name: "memory.init_failed", error = %e, "Failed to initialize embedder; memory disabled");
            None
        }
    }
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: LlmSettings) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        "LLM configuration loaded"
    );

    let model: Arc<dyn ModelClient> = Arc::new(ChatCompletionsClient::new(settings));
    let memory = init_memory(&config).await;
    let bible = Arc::new(BibleClient::new(config.bible.base_url.clone()));

    let auth_file = config.storage.auth_file();
    info!(name: "storage.auth_file", path = %auth_file.display(), "Using auth storage file");
    let auth_backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(auth_file));

    let sermons = Arc::new(placeholder_catalog());
    let workspaces = WorkspaceRegistry::new(Arc::clone(&sermons), auth_backend);

    // Idle workspace cleanup
    let idle_timeout = Duration::from_secs(config.workspace.idle_timeout_secs);
    let cleanup_every = Duration::from_secs(config.workspace.cleanup_interval_secs.max(1));
    let registry = workspaces.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        loop {
            interval.tick().await;
            let removed = registry.cleanup_expired(idle_timeout);
            if removed > 0 {
                info!(name: "workspace.cleanup", removed, remaining = registry.len(), "Dropped idle workspaces");
            }
        }
    });

    let state = AppState {
        workspaces,
        model,
        memory,
        bible,
        sermons,
        config: Arc::clone(&config),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
