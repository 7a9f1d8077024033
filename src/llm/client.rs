//! Rate-limited provider client
//!
//! Wraps an [`LlmProvider`] so that every call waits on the shared
//! [`ConcurrencyGate`], is bounded by a per-call timeout, and can be
//! abandoned through a cancellation token while queued.

use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::core::{
    error::LlmError,
    provider::LlmProvider,
    types::{GenerateRequest, GenerateResponse},
};
use super::gate::{ConcurrencyGate, GateError};

/// Failure of a single gated invocation
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    /// The caller's token fired before the call started
    #[error("invocation cancelled")]
    Cancelled,

    #[error(transparent)]
    GateClosed(#[from] GateError),

    #[error(transparent)]
    Provider(#[from] LlmError),
}

#[derive(Clone)]
pub struct RateLimitedClient {
    provider: Arc<dyn LlmProvider>,
    gate: ConcurrencyGate,
    call_timeout: Duration,
}

impl RateLimitedClient {
    pub fn new(provider: Arc<dyn LlmProvider>, gate: ConcurrencyGate, call_timeout: Duration) -> Self {
        Self {
            provider,
            gate,
            call_timeout,
        }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Issue one provider call under the gate
    ///
    /// Exactly one outbound request is made per successful acquisition. The
    /// permit is released when this function returns, whatever the outcome.
    /// Once the call has started it runs to completion or timeout; the token
    /// only short-circuits the wait for a permit.
    pub async fn invoke(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, InvokeError> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InvokeError::Cancelled),
            permit = self.gate.acquire() => permit?,
        };

        debug!(
            provider = self.provider.name(),
            in_flight = self.gate.in_flight(),
            "provider call started"
        );

        match tokio::time::timeout(self.call_timeout, self.provider.generate(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(InvokeError::Provider(err)),
            Err(_) => {
                warn!(timeout = ?self.call_timeout, "provider call timed out");
                Err(InvokeError::Provider(LlmError::Timeout(self.call_timeout)))
            }
        }
    }
}
