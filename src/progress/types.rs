//! Operation and unit state as seen by pollers and subscribers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::llm::core::error::ErrorKind;
use crate::partition::ContentKind;

/// Opaque identifier of one generation operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OperationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for OperationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Queued,
    Processing,
    Completed,
    PartialFailure,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::PartialFailure | OperationStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Queued => "queued",
            OperationStatus::Processing => "processing",
            OperationStatus::Completed => "completed",
            OperationStatus::PartialFailure => "partial_failure",
            OperationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status for a fully resolved operation
///
/// Any success alongside a failure is a partial failure; an operation is
/// `failed` only when nothing succeeded.
pub fn terminal_status(completed: usize, failed: usize) -> OperationStatus {
    match (completed, failed) {
        (_, 0) => OperationStatus::Completed,
        (0, _) => OperationStatus::Failed,
        _ => OperationStatus::PartialFailure,
    }
}

/// Why a unit failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Transient,
    InvalidRequest,
    ProviderUnavailable,
    /// The provider answered but the payload held no usable items
    InvalidResponse,
    Cancelled,
    /// The concurrency gate was closed under the unit
    GateUnavailable,
    /// The unit task ended without reporting an outcome
    Internal,
}

impl From<ErrorKind> for FailureKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::RateLimited => FailureKind::RateLimited,
            ErrorKind::Transient => FailureKind::Transient,
            ErrorKind::InvalidRequest => FailureKind::InvalidRequest,
            ErrorKind::ProviderUnavailable => FailureKind::ProviderUnavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    Success { items: Vec<Value> },
    Failure { kind: FailureKind, detail: String },
}

impl UnitOutcome {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        UnitOutcome::Failure {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            UnitOutcome::Failure { kind, .. } => Some(*kind),
            UnitOutcome::Success { .. } => None,
        }
    }
}

/// Full state of one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub operation_id: OperationId,
    pub kind: ContentKind,
    pub topic: String,
    pub status: OperationStatus,
    pub total_units: usize,
    pub completed_units: usize,
    pub failed_units: usize,
    /// Outcome per unit, indexed by unit_index; `None` while pending
    pub results: Vec<Option<UnitOutcome>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Whether the final artifact reached durable storage
    pub persisted: bool,
    /// Structural failure reason
    pub error: Option<String>,
}

impl OperationSnapshot {
    pub fn new(
        operation_id: OperationId,
        kind: ContentKind,
        topic: impl Into<String>,
        total_units: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            operation_id,
            kind,
            topic: topic.into(),
            status: OperationStatus::Queued,
            total_units,
            completed_units: 0,
            failed_units: 0,
            results: vec![None; total_units],
            created_at: now,
            updated_at: now,
            persisted: false,
            error: None,
        }
    }

    /// Share of units that have an outcome, 0.0 to 100.0
    pub fn percentage(&self) -> f64 {
        if self.total_units == 0 {
            return 100.0;
        }
        (self.completed_units + self.failed_units) as f64 * 100.0 / self.total_units as f64
    }

    /// Every unit has an outcome
    pub fn is_resolved(&self) -> bool {
        self.completed_units + self.failed_units == self.total_units
    }

    pub fn pending_units(&self) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.is_none().then_some(index))
            .collect()
    }

    /// Status the operation settles on once every unit has an outcome
    ///
    /// A recorded structural failure always yields `failed`.
    pub fn final_status(&self) -> OperationStatus {
        if self.error.is_some() {
            OperationStatus::Failed
        } else {
            terminal_status(self.completed_units, self.failed_units)
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }
}

/// Compact per-unit state for progress views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProgress {
    pub unit_index: usize,
    /// "pending", "succeeded" or "failed"
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
}

/// Progress view served to pollers and SSE subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub operation_id: OperationId,
    pub kind: ContentKind,
    pub topic: String,
    pub status: OperationStatus,
    pub total_units: usize,
    pub completed_units: usize,
    pub failed_units: usize,
    pub percentage: f64,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub units: Vec<UnitProgress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&OperationSnapshot> for ProgressSummary {
    fn from(snapshot: &OperationSnapshot) -> Self {
        let units = snapshot
            .results
            .iter()
            .enumerate()
            .map(|(unit_index, outcome)| match outcome {
                None => UnitProgress {
                    unit_index,
                    state: "pending".to_string(),
                    failure_kind: None,
                    item_count: None,
                },
                Some(UnitOutcome::Success { items }) => UnitProgress {
                    unit_index,
                    state: "succeeded".to_string(),
                    failure_kind: None,
                    item_count: Some(items.len()),
                },
                Some(UnitOutcome::Failure { kind, .. }) => UnitProgress {
                    unit_index,
                    state: "failed".to_string(),
                    failure_kind: Some(*kind),
                    item_count: None,
                },
            })
            .collect();

        Self {
            operation_id: snapshot.operation_id,
            kind: snapshot.kind,
            topic: snapshot.topic.clone(),
            status: snapshot.status,
            total_units: snapshot.total_units,
            completed_units: snapshot.completed_units,
            failed_units: snapshot.failed_units,
            percentage: (snapshot.percentage() * 100.0).round() / 100.0,
            persisted: snapshot.persisted,
            error: snapshot.error.clone(),
            units,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }
}
