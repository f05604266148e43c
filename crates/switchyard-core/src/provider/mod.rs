//! Upstream LLM providers.
//!
//! The pipeline only sees [`CompletionProvider`]; wire formats stay inside
//! each variant.

mod anthropic;
mod echo;
mod openai;
mod router;

pub use anthropic::AnthropicProvider;
pub use echo::EchoProvider;
pub use openai::OpenAiProvider;
pub use router::ProviderRouter;

use async_trait::async_trait;
use std::time::Duration;

use switchyard_types::models::ProviderCompletion;
use switchyard_types::{DecodingParams, GatewayError, NormalizedMessage};

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Non-success HTTP status from the upstream
    #[error("{provider} returned {status}: {message}")]
    Status { provider: String, status: u16, message: String },
    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },
    #[error("{provider} sent an unreadable response: {message}")]
    InvalidResponse { provider: String, message: String },
    #[error("No provider configured for model '{0}'")]
    UnknownModel(String),
    #[error("Provider did not answer within {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::UnknownModel(_) => Some(404),
            Self::Timeout(_) => Some(504),
            Self::Transport { .. } | Self::InvalidResponse { .. } => None,
        }
    }
}

impl From<ProviderError> for GatewayError {
    fn from(err: ProviderError) -> Self {
        GatewayError::upstream(err.status(), err.to_string())
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[NormalizedMessage],
        model_id: &str,
        params: &DecodingParams,
    ) -> ProviderResult<ProviderCompletion>;
}

/// Trim an upstream error body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 512;
    let body = body.trim();
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
