//! Per-operation progress tracking

pub mod error;
pub mod store;
pub mod types;

pub use error::ProgressError;
pub use store::ProgressStore;
pub use types::{
    terminal_status, FailureKind, OperationId, OperationSnapshot, OperationStatus,
    ProgressSummary, UnitOutcome, UnitProgress,
};
