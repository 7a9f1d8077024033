//! Generation pipeline: unit execution, retries and orchestration

pub mod error;
pub mod orchestrator;
pub mod parse;
pub mod prompt;
pub mod retry;
pub mod unit;

pub use error::PipelineError;
pub use orchestrator::{Orchestrator, PipelineHealth};
pub use retry::{RetryDecision, RetryMachine, RetryPolicy, UnitState};
