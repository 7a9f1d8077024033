//! Per-unit retry state machine
//!
//! ```text
//! Pending -> Retrying(n) -> ... -> Succeeded | Failed
//! ```
//!
//! Only `rate_limited` and `transient` failures are retried, at most
//! `budget` times, with exponential backoff capped at `max_delay`.

use std::time::Duration;

use crate::llm::core::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub budget: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(budget: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            budget,
            base_delay,
            max_delay,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    /// Waiting `delay` before retry number `retry`
    Retrying { retry: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
}

impl UnitState {
    pub fn is_final(&self) -> bool {
        matches!(self, UnitState::Succeeded { .. } | UnitState::Failed { .. })
    }
}

/// What the caller should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: UnitState,
    attempts: u32,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: UnitState::Pending,
            attempts: 0,
        }
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record that an attempt is being made
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn on_success(&mut self) {
        self.state = UnitState::Succeeded {
            attempts: self.attempts,
        };
    }

    /// Decide whether a failed attempt is retried
    ///
    /// A provider-supplied `Retry-After` wins over the computed backoff when
    /// it is longer; both are capped at the policy maximum.
    pub fn on_failure(&mut self, error: &LlmError) -> RetryDecision {
        let retries_used = self.attempts.saturating_sub(1);
        if !error.is_retryable() || retries_used >= self.policy.budget {
            self.give_up();
            return RetryDecision::GiveUp;
        }

        let retry = retries_used + 1;
        let delay = error
            .retry_after()
            .map_or(self.policy.backoff(retry), |hint| {
                hint.max(self.policy.backoff(retry))
            })
            .min(self.policy.max_delay);

        self.state = UnitState::Retrying { retry, delay };
        RetryDecision::RetryAfter(delay)
    }

    /// Stop without another attempt
    pub fn give_up(&mut self) {
        self.state = UnitState::Failed {
            attempts: self.attempts,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(350))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = policy();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn test_retryable_failures_until_budget() {
        let mut machine = RetryMachine::new(policy());
        let err = LlmError::ConnectionError("reset".into());

        for expected in [100, 200, 350] {
            machine.begin_attempt();
            assert_eq!(
                machine.on_failure(&err),
                RetryDecision::RetryAfter(Duration::from_millis(expected))
            );
            assert!(matches!(machine.state(), UnitState::Retrying { .. }));
        }

        machine.begin_attempt();
        assert_eq!(machine.on_failure(&err), RetryDecision::GiveUp);
        assert_eq!(machine.state(), UnitState::Failed { attempts: 4 });
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let mut machine = RetryMachine::new(policy());
        machine.begin_attempt();
        let decision = machine.on_failure(&LlmError::InvalidRequest("bad".into()));
        assert_eq!(decision, RetryDecision::GiveUp);
        assert_eq!(machine.state(), UnitState::Failed { attempts: 1 });
    }

    #[test]
    fn test_retry_after_hint_preferred_when_longer() {
        let mut machine = RetryMachine::new(RetryPolicy::new(
            2,
            Duration::from_millis(10),
            Duration::from_secs(5),
        ));
        machine.begin_attempt();
        let decision = machine.on_failure(&LlmError::RateLimitExceeded {
            retry_after: Some(Duration::from_secs(2)),
        });
        assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_secs(2)));

        machine.begin_attempt();
        let decision = machine.on_failure(&LlmError::RateLimitExceeded {
            retry_after: Some(Duration::from_secs(60)),
        });
        assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_secs(5)));
    }

    #[test]
    fn test_success_records_attempts() {
        let mut machine = RetryMachine::new(policy());
        machine.begin_attempt();
        machine.on_failure(&LlmError::Timeout(Duration::from_secs(1)));
        machine.begin_attempt();
        machine.on_success();
        assert_eq!(machine.state(), UnitState::Succeeded { attempts: 2 });
        assert!(machine.state().is_final());
    }

    #[test]
    fn test_zero_budget_never_retries() {
        let mut machine = RetryMachine::new(RetryPolicy::none());
        machine.begin_attempt();
        assert_eq!(
            machine.on_failure(&LlmError::RateLimitExceeded { retry_after: None }),
            RetryDecision::GiveUp
        );
    }
}
