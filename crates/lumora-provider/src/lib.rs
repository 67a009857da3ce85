pub mod openai_compat;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai_compat::{OpenAiCompatProvider, ProviderErrorKind};

/// One message in the request handed to the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    #[serde(default)]
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// External language-model collaborator: structured context in, free
/// text out. Failures surface to the caller's single fallback path.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Configuration for the provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used in logs (e.g. "openai", "my-proxy").
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL; defaults to the OpenAI endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Create a provider from configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let base_url = config
        .base_url
        .as_deref()
        .unwrap_or("https://api.openai.com/v1");
    Ok(Arc::new(OpenAiCompatProvider::new(
        config.api_key.clone(),
        base_url,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_defaults_base_url() {
        let config = ProviderConfig {
            id: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_key: Some("sk-test".into()),
            base_url: None,
        };
        assert!(create_provider(&config).is_ok());
    }
}
