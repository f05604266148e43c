use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use switchyard_types::models::ProviderCompletion;
use switchyard_types::{DecodingParams, NormalizedMessage};

use super::{truncate_body, CompletionProvider, ProviderError, ProviderResult};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiProvider {
    name: String,
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(name: impl Into<String>, client: Client, base_url: Option<&str>, api_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            client,
            base_url: base_url.unwrap_or(DEFAULT_OPENAI_BASE_URL).trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn build_body(messages: &[NormalizedMessage], model_id: &str, params: &DecodingParams) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({ "model": model_id, "messages": messages });
        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = params.top_p {
            body["top_p"] = json!(top_p);
        }
        if !params.stop.is_empty() {
            body["stop"] = json!(params.stop);
        }
        body
    }

    fn parse_response(&self, value: &Value) -> ProviderResult<ProviderCompletion> {
        let choice = value
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .ok_or_else(|| self.invalid("missing choices"))?;

        let content = choice
            .pointer("/message/content")
            .or_else(|| choice.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| self.invalid("missing message content"))?;

        let usage = value.get("usage");
        Ok(ProviderCompletion {
            content: content.to_string(),
            prompt_tokens: usage.and_then(|u| u.get("prompt_tokens")).and_then(Value::as_u64),
            completion_tokens: usage.and_then(|u| u.get("completion_tokens")).and_then(Value::as_u64),
        })
    }

    fn invalid(&self, message: &str) -> ProviderError {
        ProviderError::InvalidResponse { provider: self.name.clone(), message: message.to_string() }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[NormalizedMessage],
        model_id: &str,
        params: &DecodingParams,
    ) -> ProviderResult<ProviderCompletion> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self.client.post(&url).json(&Self::build_body(messages, model_id, params));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
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

        let value: Value = response.json().await.map_err(|e| self.invalid(&e.to_string()))?;
        self.parse_response(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_types::Role;

    #[test]
    fn test_body_omits_unset_params() {
        let messages = vec![NormalizedMessage { role: Role::User, content: "hi".into() }];
        let body = OpenAiProvider::build_body(&messages, "gpt-4", &DecodingParams::default());
        assert_eq!(body, json!({"model": "gpt-4", "messages": [{"role": "user", "content": "hi"}]}));

        let params = DecodingParams { max_tokens: Some(32), stop: vec!["END".into()], ..Default::default() };
        let body = OpenAiProvider::build_body(&messages, "gpt-4", &params);
        assert_eq!(body["max_tokens"], 32);
        assert_eq!(body["stop"], json!(["END"]));
        assert!(body.get("temperature").is_none());
    }
}
