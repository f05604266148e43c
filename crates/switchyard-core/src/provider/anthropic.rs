use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use switchyard_types::models::ProviderCompletion;
use switchyard_types::{DecodingParams, NormalizedMessage, Role};

use super::{truncate_body, CompletionProvider, ProviderError, ProviderResult};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// `/v1/messages` requires `max_tokens`
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic Messages API. System messages move to the top-level `system` field.
pub struct AnthropicProvider {
    name: String,
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AnthropicProvider {
    pub fn new(name: impl Into<String>, client: Client, base_url: Option<&str>, api_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            client,
            base_url: base_url.unwrap_or(DEFAULT_ANTHROPIC_BASE_URL).trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn build_body(messages: &[NormalizedMessage], model_id: &str, params: &DecodingParams) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": model_id,
            "messages": turns,
            "max_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }
        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = params.top_p {
            body["top_p"] = json!(top_p);
        }
        if !params.stop.is_empty() {
            body["stop_sequences"] = json!(params.stop);
        }
        body
    }

    fn parse_response(&self, value: &Value) -> ProviderResult<ProviderCompletion> {
        let blocks = value.get("content").and_then(Value::as_array).ok_or_else(|| {
            ProviderError::InvalidResponse { provider: self.name.clone(), message: "missing content".into() }
        })?;

        let content: Vec<&str> = blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect();

        let usage = value.get("usage");
        Ok(ProviderCompletion {
            content: content.join(""),
            prompt_tokens: usage.and_then(|u| u.get("input_tokens")).and_then(Value::as_u64),
            completion_tokens: usage.and_then(|u| u.get("output_tokens")).and_then(Value::as_u64),
        })
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[NormalizedMessage],
        model_id: &str,
        params: &DecodingParams,
    ) -> ProviderResult<ProviderCompletion> {
        let url = format!("{}/v1/messages", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&Self::build_body(messages, model_id, params));
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| ProviderError::Transport {
            provider: self.name.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %self.name, status = status.as_u16(), "Upstream returned error");
            return Err(ProviderError::Status {
                provider: self.name.clone(),
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        let value: Value = response.json().await.map_err(|e| ProviderError::InvalidResponse {
            provider: self.name.clone(),
            message: e.to_string(),
        })?;
        self.parse_response(&value)
    }
}
