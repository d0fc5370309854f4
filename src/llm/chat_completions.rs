//! OpenAI-compatible Chat Completions client.
//!
//! Sends one non-streaming request with `response_format: json_object` and
//! parses the assistant message content as a JSON object.

use serde_json::{Value, json};

use super::{ChatMessage, LlmSettings, ModelClient, ModelError};

/// Client for OpenAI-compatible Chat Completions endpoints.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("provider", &self.settings.provider)
            .finish()
    }
}

impl ChatCompletionsClient {
    /// Create a new client with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl ModelClient for ChatCompletionsClient {
    async fn complete_json(&self, messages: Vec<ChatMessage>) -> Result<Value, ModelError> {
        let url = self.settings.provider.build_chat_url(&self.settings.base_url);

        let mut body = json!({
            "model": self.settings.model,
            "messages": messages,
            "response_format": { "type": "json_object" },
        });
        if let Some(t) = self.settings.temperature {
            body["temperature"] = json!(t);
        }

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", k)
            } else {
                rb.bearer_auth(k)
            };
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                name: "llm.request.failed",
                status = status.as_u16(),
                "Model provider returned an error status"
            );
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let v: Value = resp.json().await?;
        let content = v["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ModelError::Malformed("missing choices[0].message.content".to_string()))?;

        parse_json_content(content)
    }
}

/// Parse the assistant content as a JSON object, tolerating a Markdown
/// code fence around it.
fn parse_json_content(content: &str) -> Result<Value, ModelError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value =
        serde_json::from_str(unfenced).map_err(|e| ModelError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ModelError::Malformed("expected a JSON object".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_object() {
        let v = parse_json_content(r#"{"reply": "Amen"}"#).unwrap();
        assert_eq!(v["reply"], "Amen");
    }

    #[test]
    fn test_parse_fenced_object() {
        let v = parse_json_content("```json\n{\"summary\": \"Grace\"}\n```").unwrap();
        assert_eq!(v["summary"], "Grace");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_json_content("[1, 2]"),
            Err(ModelError::Malformed(_))
        ));
        assert!(matches!(
            parse_json_content("Sure! Here is your answer."),
            Err(ModelError::Malformed(_))
        ));
    }
}
