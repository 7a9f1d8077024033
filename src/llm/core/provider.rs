//! Provider trait for LLM implementations

use async_trait::async_trait;
use std::sync::Arc;

use super::{
    error::LlmError,
    types::{GenerateRequest, GenerateResponse},
};
use crate::config::ProviderConfig;
use crate::llm::openai::OpenAiClient;

/// Main interface that all LLM provider implementations must satisfy
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a complete response for the request
    ///
    /// Implementations issue exactly one outbound call and map every failure
    /// onto [`LlmError`] so callers can classify it with [`LlmError::kind`].
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;

    /// Short name used in logs and health output
    fn name(&self) -> &str;
}

/// Stand-in provider used when no API key is configured
///
/// Every call fails with [`LlmError::NotConfigured`], which the pipeline
/// records as `provider_unavailable` without retrying.
pub struct UnconfiguredProvider;

#[async_trait]
impl LlmProvider for UnconfiguredProvider {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        Err(LlmError::NotConfigured(
            "no API key configured for the generation provider".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Create the provider described by the configuration
///
/// Falls back to [`UnconfiguredProvider`] when no API key is present so the
/// service can still start and report degraded health.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if !config.is_configured() {
        return Ok(Arc::new(UnconfiguredProvider));
    }
    let client = OpenAiClient::new(config)?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::core::config::GenerationConfig;

    #[tokio::test]
    async fn test_unconfigured_provider_fails_unavailable() {
        let provider = UnconfiguredProvider;
        let request = GenerateRequest::from_prompt("hello", GenerationConfig::default());
        let err = provider.generate(request).await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_create_provider_without_key() {
        let config = ProviderConfig::default();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "unconfigured");
    }

    #[test]
    fn test_create_provider_with_key() {
        let config = ProviderConfig::default().with_api_key("sk-test");
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }
}
