//! Mapping between abstraction types and chat-completions types

use std::time::Duration;

use crate::llm::core::{
    error::LlmError,
    types::{FinishReason, GenerateRequest, GenerateResponse, MessageRole, UsageMetadata},
};

use super::types::{
    ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat,
};

/// Convert our abstraction request to the chat-completions request format
pub fn to_openai_request(request: GenerateRequest, model: &str) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(system),
        });
    }
    messages.extend(request.messages.into_iter().map(|message| ChatMessage {
        role: match message.role {
            MessageRole::User => "user".to_string(),
            MessageRole::Assistant => "assistant".to_string(),
        },
        content: Some(message.content),
    }));

    ChatCompletionRequest {
        model: model.to_string(),
        messages,
        max_tokens: request.config.max_tokens,
        temperature: request.config.temperature,
        top_p: request.config.top_p,
        response_format: request.config.json_mode.then(|| ResponseFormat {
            format_type: "json_object".to_string(),
        }),
    }
}

/// Convert a chat-completions response into our abstraction response
///
/// A response without choices or without text content is a provider error:
/// there is nothing to hand back to the caller.
pub fn from_openai_response(response: ChatCompletionResponse) -> Result<GenerateResponse, LlmError> {
    let usage = response
        .usage
        .map(|usage| UsageMetadata::new(usage.prompt_tokens, usage.completion_tokens))
        .unwrap_or_default();

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::ProviderError {
            code: "empty_choices".to_string(),
            message: "response contained no choices".to_string(),
        })?;

    let finish_reason = map_finish_reason(choice.finish_reason.as_deref());
    let text = choice.message.content.ok_or_else(|| LlmError::ProviderError {
        code: "empty_content".to_string(),
        message: format!("choice finished with {:?} and no content", finish_reason),
    })?;

    Ok(GenerateResponse {
        id: response.id,
        text,
        finish_reason,
        usage,
    })
}

/// Map the provider's finish reason string
pub fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") | None => FinishReason::Stop,
        Some("length") => FinishReason::MaxTokens,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(other) => FinishReason::Other(other.to_string()),
    }
}

/// Build an error from a non-success response body
///
/// Quota exhaustion is reported with HTTP 429 but will not clear by waiting,
/// so it is surfaced as a provider error instead of a rate limit.
pub fn error_from_response(status: u16, body: String, retry_after: Option<Duration>) -> LlmError {
    let detail = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .map(|envelope| envelope.error);

    if let Some(detail) = &detail {
        if detail.code.as_deref() == Some("insufficient_quota") {
            return LlmError::ProviderError {
                code: "insufficient_quota".to_string(),
                message: detail.message.clone(),
            };
        }
    }

    let message = detail.map(|detail| detail.message).unwrap_or(body);
    LlmError::from_status(status, message, retry_after)
}
