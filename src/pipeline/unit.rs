//! Execution of a single generation unit

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::llm::{client::InvokeError, core::config::GenerationConfig, RateLimitedClient};
use crate::partition::{GenerationRequest, GenerationUnit};
use crate::progress::types::{FailureKind, UnitOutcome};

use super::parse::parse_items;
use super::prompt::build_request;
use super::retry::{RetryDecision, RetryMachine, RetryPolicy};

/// Everything a unit needs, shared by all units of one operation
#[derive(Clone)]
pub struct UnitContext {
    pub client: RateLimitedClient,
    pub request: Arc<GenerationRequest>,
    pub retry: RetryPolicy,
    pub generation: GenerationConfig,
}

/// Drive one unit to its outcome
///
/// Retries `rate_limited` and `transient` failures according to the policy.
/// No permit is held while backing off. Cancellation before a call starts,
/// or during backoff, yields a `cancelled` outcome; a call already in
/// flight finishes with its real result.
pub async fn execute(ctx: &UnitContext, unit: &GenerationUnit, cancel: &CancellationToken) -> UnitOutcome {
    let unit_index = unit.unit_index;
    let provider_request = build_request(&ctx.request, &unit.input, &ctx.generation);
    let mut machine = RetryMachine::new(ctx.retry);

    loop {
        let attempt = machine.begin_attempt();
        let error = match ctx.client.invoke(provider_request.clone(), cancel).await {
            Ok(response) => {
                return match parse_items(&response.text, unit_index) {
                    Ok(items) => {
                        machine.on_success();
                        debug!(unit_index, attempt, items = items.len(), "unit succeeded");
                        UnitOutcome::Success { items }
                    }
                    Err(e) => {
                        machine.give_up();
                        warn!(unit_index, attempt, error = %e, "unusable provider response");
                        UnitOutcome::failure(FailureKind::InvalidResponse, e.to_string())
                    }
                };
            }
            Err(InvokeError::Cancelled) => {
                machine.give_up();
                return UnitOutcome::failure(FailureKind::Cancelled, "cancelled before the call started");
            }
            Err(InvokeError::GateClosed(e)) => {
                machine.give_up();
                return UnitOutcome::failure(FailureKind::GateUnavailable, e.to_string());
            }
            Err(InvokeError::Provider(error)) => error,
        };

        match machine.on_failure(&error) {
            RetryDecision::GiveUp => {
                warn!(unit_index, attempt, error = %error, "unit failed");
                return UnitOutcome::failure(error.kind().into(), error.to_string());
            }
            RetryDecision::RetryAfter(delay) => {
                debug!(unit_index, attempt, ?delay, error = %error, "retrying unit");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        machine.give_up();
                        return UnitOutcome::failure(
                            FailureKind::Cancelled,
                            format!("cancelled while backing off after: {}", error),
                        );
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
