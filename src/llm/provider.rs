//! Provider-specific configuration and detection.
//!
//! This module handles differences between model API providers, including
//! URL patterns and authentication headers.

/// Supported model providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// Deployment name (required for Azure)
        deployment_name: String,
        /// API version (e.g., "2024-08-01-preview")
        api_version: String,
    },
    /// Google AI Studio, through its OpenAI-compatible endpoint
    GoogleAi,
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Together AI (together.ai, together.xyz)
    TogetherAI,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible provider
    Generic,
}

/// Default Azure API version when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kadda_connect::llm::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://generativelanguage.googleapis.com");
    /// assert_eq!(provider, Provider::GoogleAi);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            }
        } else if lower.contains("generativelanguage.googleapis.com") {
            Self::GoogleAi
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("together.ai") || lower.contains("together.xyz") {
            Self::TogetherAI
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Whether the API key goes in an `api-key` header instead of bearer auth.
    #[must_use]
    pub fn uses_api_key_header(&self) -> bool {
        matches!(self, Self::AzureOpenAI { .. })
    }

    /// Build the chat completions URL for this provider.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL (trailing slash tolerated)
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => {
                format!(
                    "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
                )
            }
            Self::GoogleAi => format!("{base}/v1beta/openai/chat/completions"),
            Self::OpenRouter => format!("{base}/api/v1/chat/completions"),
            _ => format!("{base}/v1/chat/completions"),
        }
    }
}
