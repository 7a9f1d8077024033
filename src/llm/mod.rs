//! LLM Abstraction Layer
//!
//! A provider-neutral request/response model, an OpenAI-compatible provider,
//! and the process-wide concurrency gate every outbound call passes through.

pub mod client;
pub mod core;
pub mod gate;
pub mod openai;

// Re-export commonly used types
pub use client::{InvokeError, RateLimitedClient};
pub use core::{
    config::GenerationConfig,
    error::{ErrorKind, LlmError},
    provider::{create_provider, LlmProvider, UnconfiguredProvider},
    types::{FinishReason, GenerateRequest, GenerateResponse, Message, MessageRole, UsageMetadata},
};
pub use gate::{ConcurrencyGate, GateError, GatePermit};
