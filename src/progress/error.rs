use thiserror::Error;

use super::types::OperationId;

/// Errors from the progress store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("operation {0} not found")]
    NotFound(OperationId),

    #[error("operation {0} already exists")]
    AlreadyExists(OperationId),

    #[error("unit {unit_index} of operation {operation_id} was already recorded")]
    AlreadyRecorded {
        operation_id: OperationId,
        unit_index: usize,
    },

    #[error("unit {unit_index} is out of range for operation {operation_id} with {total_units} units")]
    UnitOutOfRange {
        operation_id: OperationId,
        unit_index: usize,
        total_units: usize,
    },

    #[error("operation {0} has already reached a terminal status")]
    AlreadyTerminal(OperationId),

    #[error("operation {0} has not reached a terminal status")]
    NotTerminal(OperationId),

    #[error("operation {operation_id} still has {pending} pending units")]
    Unresolved {
        operation_id: OperationId,
        pending: usize,
    },
}

impl ProgressError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressError::NotFound(_) => "not_found",
            ProgressError::NotTerminal(_) | ProgressError::Unresolved { .. } => "not_ready",
            _ => "conflict",
        }
    }
}
