//! Final assembled output of an operation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::partition::{ContentKind, GenerationRequest};
use crate::progress::types::{
    FailureKind, OperationId, OperationSnapshot, OperationStatus, UnitOutcome,
};

/// Generated study material, persisted once the operation resolves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationArtifact {
    pub operation_id: OperationId,
    pub kind: ContentKind,
    pub topic: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub difficulty: String,
    pub status: OperationStatus,
    /// Items from every successful unit, in unit order
    pub items: Vec<Value>,
    /// Outcome of every unit, indexed by unit_index
    pub units: Vec<UnitOutcome>,
    pub completed_units: usize,
    pub failed_units: usize,
    pub generated_at: DateTime<Utc>,
}

impl GenerationArtifact {
    /// Assemble the artifact from a resolved snapshot
    ///
    /// Ordering follows `unit_index`, never completion order.
    pub fn assemble(
        snapshot: &OperationSnapshot,
        request: &GenerationRequest,
        status: OperationStatus,
    ) -> Self {
        let units: Vec<UnitOutcome> = snapshot
            .results
            .iter()
            .map(|outcome| {
                outcome
                    .clone()
                    .unwrap_or_else(|| UnitOutcome::failure(FailureKind::Internal, "no outcome"))
            })
            .collect();

        let items = units
            .iter()
            .filter_map(|outcome| match outcome {
                UnitOutcome::Success { items } => Some(items.iter().cloned()),
                UnitOutcome::Failure { .. } => None,
            })
            .flatten()
            .collect();

        Self {
            operation_id: snapshot.operation_id,
            kind: request.kind,
            topic: request.topic.trim().to_string(),
            subject: request.subject.clone(),
            difficulty: request.difficulty.clone(),
            status,
            items,
            units,
            completed_units: snapshot.completed_units,
            failed_units: snapshot.failed_units,
            generated_at: Utc::now(),
        }
    }
}
