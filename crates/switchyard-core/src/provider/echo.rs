use async_trait::async_trait;

use switchyard_types::models::ProviderCompletion;
use switchyard_types::{DecodingParams, NormalizedMessage, Role};

use super::{CompletionProvider, ProviderResult};
use crate::ledger::{estimate_prompt_tokens, estimate_tokens};

/// Offline provider that answers with the last user message.
pub struct EchoProvider {
    name: String,
}

impl EchoProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for EchoProvider {
    fn default() -> Self {
        Self::new("echo")
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[NormalizedMessage],
        _model_id: &str,
        params: &DecodingParams,
    ) -> ProviderResult<ProviderCompletion> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let content: String = match params.max_tokens {
            // One token is roughly four characters
            Some(max) => last_user.chars().take(max as usize * 4).collect(),
            None => last_user.to_string(),
        };

        Ok(ProviderCompletion {
            prompt_tokens: Some(estimate_prompt_tokens(messages)),
            completion_tokens: Some(estimate_tokens(&content)),
            content,
        })
    }
}
