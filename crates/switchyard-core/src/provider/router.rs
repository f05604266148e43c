use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use switchyard_types::models::key::ALL_MODELS;
use switchyard_types::models::{ProviderCompletion, ProviderConfig, ProviderKind};
use switchyard_types::{DecodingParams, NormalizedMessage};

use super::{
    AnthropicProvider, CompletionProvider, EchoProvider, OpenAiProvider, ProviderError, ProviderResult,
};
use crate::error::{AppError, AppResult};

/// Routes a model id to the provider configured for it.
///
/// A provider listing `"*"` becomes the fallback for unlisted models.
#[derive(Default)]
pub struct ProviderRouter {
    routes: HashMap<String, Arc<dyn CompletionProvider>>,
    fallback: Option<Arc<dyn CompletionProvider>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, model_id: impl Into<String>, provider: Arc<dyn CompletionProvider>) -> Self {
        self.routes.insert(model_id.into(), provider);
        self
    }

    pub fn fallback(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Build providers from config. With nothing configured every model is
    /// answered by the offline echo provider.
    pub fn from_config(configs: &[ProviderConfig], request_timeout: Duration) -> AppResult<Self> {
        if configs.is_empty() {
            tracing::warn!("No providers configured, routing all models to the echo provider");
            return Ok(Self::new().fallback(Arc::new(EchoProvider::default())));
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Provider(format!("Failed to build HTTP client: {}", e)))?;

        let mut router = Self::new();
        for config in configs {
            let api_key = config.resolve_api_key();
            if api_key.is_none() && config.kind != ProviderKind::Echo {
                tracing::warn!(provider = %config.name, "Provider has no API key configured");
            }

            let provider: Arc<dyn CompletionProvider> = match config.kind {
                ProviderKind::Openai => Arc::new(OpenAiProvider::new(
                    &config.name,
                    client.clone(),
                    config.base_url.as_deref(),
                    api_key,
                )),
                ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
                    &config.name,
                    client.clone(),
                    config.base_url.as_deref(),
                    api_key,
                )),
                ProviderKind::Echo => Arc::new(EchoProvider::new(&config.name)),
            };

            for model in &config.models {
                if model == ALL_MODELS {
                    router.fallback = Some(Arc::clone(&provider));
                } else if router.routes.insert(model.clone(), Arc::clone(&provider)).is_some() {
                    tracing::warn!(model = %model, provider = %config.name, "Model routed twice, last provider wins");
                }
            }
            tracing::info!(
                provider = %config.name,
                kind = %config.kind,
                models = config.models.len(),
                "Registered provider"
            );
        }

        Ok(router)
    }

    pub fn resolve(&self, model_id: &str) -> Option<&Arc<dyn CompletionProvider>> {
        self.routes.get(model_id).or(self.fallback.as_ref())
    }

    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.routes.keys().cloned().collect();
        models.sort();
        models
    }
}

#[async_trait]
impl CompletionProvider for ProviderRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn complete(
        &self,
        messages: &[NormalizedMessage],
        model_id: &str,
        params: &DecodingParams,
    ) -> ProviderResult<ProviderCompletion> {
        let provider =
            self.resolve(model_id).ok_or_else(|| ProviderError::UnknownModel(model_id.to_string()))?;
        tracing::debug!(model = %model_id, provider = %provider.name(), "Dispatching to provider");
        provider.complete(messages, model_id, params).await
    }
}
