//! OpenAI-compatible chat-completions client

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::llm::core::{
    error::LlmError,
    provider::LlmProvider,
    types::{GenerateRequest, GenerateResponse},
};

use super::mapper::{error_from_response, from_openai_response, to_openai_request};
use super::types::ChatCompletionResponse;

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiClient {
    /// HTTP client for making requests
    http_client: Client,
    api_key: String,
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Create a new client from provider configuration
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::NotConfigured`] when no API key is present, or an
    /// HTTP error if the underlying client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::HttpError {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_endpoint_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Parse a `Retry-After` header expressed in (possibly fractional) seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let body = to_openai_request(request, &self.model);

        let url = self.build_endpoint_url();
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_else(|_| String::new());
            debug!(status = status.as_u16(), "chat completion rejected");
            return Err(error_from_response(status.as_u16(), body, retry_after));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        from_openai_response(completion)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
