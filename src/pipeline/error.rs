use thiserror::Error;

use crate::partition::PartitionError;
use crate::progress::{error::ProgressError, types::OperationId};
use crate::store::StoreError;

/// Errors returned by orchestrator operations
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] PartitionError),

    #[error("operation {0} not found")]
    NotFound(OperationId),

    #[error("operation {0} has not finished")]
    NotReady(OperationId),

    #[error("the pipeline is shutting down")]
    ShuttingDown,

    #[error("artifact store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Progress(ProgressError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::NotReady(_) => "not_ready",
            PipelineError::ShuttingDown => "shutting_down",
            PipelineError::Store(e) => e.kind(),
            PipelineError::Progress(_) => "internal",
        }
    }
}

impl From<ProgressError> for PipelineError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::NotFound(id) => PipelineError::NotFound(id),
            ProgressError::NotTerminal(id) => PipelineError::NotReady(id),
            other => PipelineError::Progress(other),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => PipelineError::NotFound(id),
            other => PipelineError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let id = OperationId::new();
        assert_eq!(PipelineError::from(PartitionError::ZeroCount).kind(), "invalid_input");
        assert_eq!(PipelineError::from(ProgressError::NotFound(id)).kind(), "not_found");
        assert_eq!(PipelineError::from(ProgressError::NotTerminal(id)).kind(), "not_ready");
        assert_eq!(PipelineError::from(StoreError::NotFound(id)).kind(), "not_found");
        assert_eq!(
            PipelineError::from(StoreError::ConnectionError("refused".into())).kind(),
            "persistence_failure"
        );
        assert_eq!(PipelineError::ShuttingDown.kind(), "shutting_down");
    }
}
