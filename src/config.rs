//! Service configuration.
//!
//! Layers, lowest priority first: built-in defaults, an optional YAML file
//! (`--config`, `CONFIG_FILE`, or `./config.yaml`), `KADDA_`-prefixed
//! environment variables (`KADDA_SERVER__PORT=8000`), then CLI flags and
//! their plain env fallbacks (`PORT`, `DATA_DIR`, `MEMORY_ENABLED`).
//!
//! Model connection settings come from `LLM_*` variables; see
//! [`load_llm_settings`].

use std::path::{Path, PathBuf};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::bible::DEFAULT_BIBLE_API_URL;
use crate::llm::provider::DEFAULT_AZURE_API_VERSION;
use crate::llm::{LlmSettings, Provider};
use crate::memory::DEFAULT_MAX_SNIPPETS_PER_USER;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(name = "kadda-connect", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Directory for persisted sign-in state
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable long-term memory (downloads the embedding model on first start)
    #[arg(long, env = "MEMORY_ENABLED")]
    pub memory_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub workspace: WorkspaceConfig,
    pub memory: MemoryConfig,
    pub bible: BibleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Zero disables the request timeout.
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// JSON file holding every session's auth blob.
    #[must_use]
    pub fn auth_file(&self) -> PathBuf {
        self.data_dir.join("local-storage.json")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    pub idle_timeout_secs: u64,
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    pub enabled: bool,
    /// Oldest snippets beyond this count are evicted per member.
    pub max_snippets_per_user: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BibleConfig {
    pub base_url: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 60)?
            .set_default("server.body_limit_bytes", 1024 * 1024)?
            .set_default("storage.data_dir", "data")?
            .set_default("workspace.idle_timeout_secs", 30 * 60)?
            .set_default("workspace.cleanup_interval_secs", 60)?
            .set_default("memory.enabled", true)?
            .set_default("memory.max_snippets_per_user", DEFAULT_MAX_SNIPPETS_PER_USER as u64)?
            .set_default("bible.base_url", DEFAULT_BIBLE_API_URL)?;

        // An explicit file must exist; the working-directory fallback is optional.
        match &cli.config {
            Some(path) => builder = builder.add_source(File::from(path.as_path()).required(true)),
            None => {
                builder = builder
                    .add_source(File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("KADDA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(dir) = cli.data_dir {
            builder = builder.set_override("storage.data_dir", dir.to_string_lossy().to_string())?;
        }
        if let Some(enabled) = cli.memory_enabled {
            builder = builder.set_override("memory.enabled", enabled)?;
        }

        builder.build()?.try_deserialize()
    }
}

/// Read model settings from the process environment.
pub fn load_llm_settings() -> Result<LlmSettings, String> {
    llm_settings_from(|key| std::env::var(key).ok())
}

/// Build model settings from a variable lookup.
///
/// `LLM_BASE_URL` and `LLM_MODEL` are required. The provider is detected
/// from the base URL; Azure additionally reads `AZURE_DEPLOYMENT_NAME` and
/// `AZURE_API_VERSION`.
pub fn llm_settings_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<LlmSettings, String> {
    let base_url =
        lookup("LLM_BASE_URL").ok_or_else(|| "Missing required env var: LLM_BASE_URL".to_string())?;
    if base_url.trim().is_empty() {
        return Err("LLM_BASE_URL cannot be empty".to_string());
    }

    let model =
        lookup("LLM_MODEL").ok_or_else(|| "Missing required env var: LLM_MODEL".to_string())?;
    if model.trim().is_empty() {
        return Err("LLM_MODEL cannot be empty".to_string());
    }

    let api_key = lookup("LLM_API_KEY").filter(|s| !s.trim().is_empty());

    let temperature = match lookup("LLM_TEMPERATURE").filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            raw.trim()
                .parse::<f32>()
                .map_err(|e| format!("LLM_TEMPERATURE is not a number: {e}"))?,
        ),
        None => None,
    };

    let mut provider = Provider::detect_from_url(&base_url);
    if let Provider::AzureOpenAI { .. } = &provider {
        let deployment_name = lookup("AZURE_DEPLOYMENT_NAME")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| "Azure endpoints require AZURE_DEPLOYMENT_NAME".to_string())?;
        provider = Provider::AzureOpenAI {
            deployment_name,
            api_version: lookup("AZURE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
        };
    }

    Ok(LlmSettings {
        base_url,
        api_key,
        model,
        provider,
        temperature,
    })
}
