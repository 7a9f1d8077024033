//! Fan-out/fan-in orchestration of generation operations
//!
//! `submit` partitions a request, registers it with the progress store and
//! returns at once. A background task then runs every unit concurrently,
//! bounded only by the shared concurrency gate, waits for the store to
//! report that every unit has an outcome, and finalizes the operation.

use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, task::JoinSet};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, info_span, warn, Instrument};

use futures_util::Stream;

use crate::artifact::GenerationArtifact;
use crate::config::PipelineConfig;
use crate::events::progress_stream;
use crate::llm::{core::config::GenerationConfig, RateLimitedClient};
use crate::partition::{GenerationRequest, GenerationUnit, Partitioner};
use crate::progress::{
    types::{FailureKind, OperationId, OperationSnapshot, UnitOutcome},
    ProgressError, ProgressStore,
};
use crate::store::FallbackCache;

use super::error::PipelineError;
use super::retry::RetryPolicy;
use super::unit::{self, UnitContext};

/// Point-in-time view of the pipeline for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct PipelineHealth {
    pub provider: String,
    pub gate_capacity: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub active_operations: usize,
    pub tracked_operations: usize,
    pub durable_store: bool,
    pub shutting_down: bool,
}

struct OrchestratorInner {
    client: RateLimitedClient,
    progress: ProgressStore,
    cache: FallbackCache,
    partitioner: Partitioner,
    retry: RetryPolicy,
    generation: GenerationConfig,
    /// Cancellation handles of operations that have not finalized
    running: Mutex<HashMap<OperationId, CancellationToken>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

impl Orchestrator {
    pub fn new(
        client: RateLimitedClient,
        progress: ProgressStore,
        cache: FallbackCache,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                client,
                progress,
                cache,
                partitioner: Partitioner::new(config.limits),
                retry: config.retry,
                generation: config.generation.clone(),
                running: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.inner.progress
    }

    pub fn client(&self) -> &RateLimitedClient {
        &self.inner.client
    }

    /// Accept a bulk request and start working on it in the background
    ///
    /// Invalid input is rejected before any operation exists. Returns the
    /// snapshot as accepted, before any unit has run.
    pub fn submit(&self, request: GenerationRequest) -> Result<OperationSnapshot, PipelineError> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(PipelineError::ShuttingDown);
        }

        let units = inner.partitioner.partition(&request)?;
        let operation_id = OperationId::new();
        let accepted = inner
            .progress
            .create(operation_id, request.kind, request.topic.trim(), units.len())?;

        let token = inner.shutdown.child_token();
        inner.running.lock().insert(operation_id, token.clone());

        info!(
            %operation_id,
            kind = request.kind.as_str(),
            units = units.len(),
            items = request.count,
            "operation submitted"
        );

        let span = info_span!("operation", %operation_id);
        inner.tracker.spawn(
            run_operation(inner.clone(), operation_id, Arc::new(request), units, token)
                .instrument(span),
        );

        Ok(accepted)
    }

    /// Signal an operation to stop scheduling work
    ///
    /// Units that have not started are recorded as cancelled; calls already
    /// in flight finish with their real outcome. Cancelling a finished
    /// operation is a no-op.
    pub fn cancel(&self, operation_id: OperationId) -> Result<OperationSnapshot, PipelineError> {
        let snapshot = self.inner.progress.get(operation_id)?;
        if let Some(token) = self.inner.running.lock().get(&operation_id) {
            info!(%operation_id, "operation cancelled");
            token.cancel();
        }
        Ok(snapshot)
    }

    pub fn get_progress(&self, operation_id: OperationId) -> Result<OperationSnapshot, PipelineError> {
        Ok(self.inner.progress.get(operation_id)?)
    }

    /// Live snapshots until the operation is terminal
    pub fn stream_progress(
        &self,
        operation_id: OperationId,
    ) -> Result<impl Stream<Item = OperationSnapshot> + Send + 'static, PipelineError> {
        let receiver: watch::Receiver<OperationSnapshot> =
            self.inner.progress.subscribe(operation_id)?;
        Ok(progress_stream(receiver))
    }

    /// Final artifact of a terminal operation
    ///
    /// Falls back to the artifact store once the progress entry is evicted.
    pub async fn get_result(&self, operation_id: OperationId) -> Result<GenerationArtifact, PipelineError> {
        match self.inner.progress.get(operation_id) {
            Ok(snapshot) if !snapshot.status.is_terminal() => {
                Err(PipelineError::NotReady(operation_id))
            }
            Ok(_) => match self.inner.progress.artifact(operation_id) {
                Ok(Some(artifact)) => Ok(artifact.as_ref().clone()),
                // Evicted since the status check, or finalized without an artifact
                Ok(None) | Err(ProgressError::NotFound(_)) => {
                    Ok(self.inner.cache.load(operation_id).await?)
                }
                Err(e) => Err(e.into()),
            },
            Err(ProgressError::NotFound(_)) => Ok(self.inner.cache.load(operation_id).await?),
            Err(e) => Err(e.into()),
        }
    }

    /// Release a terminal operation's progress entry before its retention lapses
    pub fn acknowledge(&self, operation_id: OperationId) -> Result<(), PipelineError> {
        Ok(self.inner.progress.acknowledge(operation_id)?)
    }

    /// Evict expired operations periodically until shutdown
    pub fn start_reaper(&self, interval: Duration) -> JoinHandle<()> {
        self.inner
            .progress
            .spawn_reaper(interval, self.inner.shutdown.child_token())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Stop accepting work, cancel running operations and wait for them to finalize
    ///
    /// Returns once every permit is back and the gate is closed.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if !inner.shutdown.is_cancelled() {
            info!(
                active = inner.running.lock().len(),
                "shutting down generation pipeline"
            );
        }
        inner.shutdown.cancel();
        inner.tracker.close();
        inner.tracker.wait().await;

        let gate = inner.client.gate();
        gate.drain().await;
        gate.close();
        debug!("generation pipeline stopped");
    }

    pub fn health(&self) -> PipelineHealth {
        let inner = &self.inner;
        let gate = inner.client.gate();
        PipelineHealth {
            provider: inner.client.provider_name().to_string(),
            gate_capacity: gate.capacity(),
            in_flight: gate.in_flight(),
            peak_in_flight: gate.peak_in_flight(),
            active_operations: inner.running.lock().len(),
            tracked_operations: inner.progress.len(),
            durable_store: inner.cache.has_durable_store(),
            shutting_down: inner.shutdown.is_cancelled(),
        }
    }
}

/// Record an outcome, tolerating a unit that already reported
fn record(progress: &ProgressStore, operation_id: OperationId, unit_index: usize, outcome: UnitOutcome) {
    match progress.record_unit(operation_id, unit_index, outcome) {
        Ok(_) | Err(ProgressError::AlreadyRecorded { .. }) => {}
        Err(e) => warn!(unit_index, error = %e, "failed to record unit outcome"),
    }
}

async fn run_operation(
    inner: Arc<OrchestratorInner>,
    operation_id: OperationId,
    request: Arc<GenerationRequest>,
    units: Vec<GenerationUnit>,
    token: CancellationToken,
) {
    if let Err(e) = inner.progress.mark_processing(operation_id) {
        warn!(error = %e, "operation vanished before processing");
        inner.running.lock().remove(&operation_id);
        return;
    }

    let ctx = UnitContext {
        client: inner.client.clone(),
        request: request.clone(),
        retry: inner.retry,
        generation: inner.generation.clone(),
    };

    let mut tasks = JoinSet::new();
    let mut task_units = HashMap::new();
    for unit in units {
        let unit_index = unit.unit_index;
        let ctx = ctx.clone();
        let token = token.clone();
        let progress = inner.progress.clone();
        let handle = tasks.spawn(
            async move {
                let outcome = unit::execute(&ctx, &unit, &token).await;
                if outcome.failure_kind() == Some(FailureKind::GateUnavailable) {
                    // The gate never reopens; stop the remaining units.
                    if progress
                        .fail_operation(operation_id, "concurrency gate unavailable")
                        .is_ok()
                    {
                        warn!("concurrency gate closed, failing operation");
                    }
                    token.cancel();
                }
                record(&progress, operation_id, unit.unit_index, outcome);
            }
            .instrument(info_span!("unit", unit_index)),
        );
        task_units.insert(handle.id(), unit_index);
    }

    let resolved = inner.progress.wait_resolved(operation_id);
    tokio::pin!(resolved);

    let snapshot = loop {
        tokio::select! {
            result = &mut resolved => break result,
            joined = tasks.join_next(), if !tasks.is_empty() => {
                if let Some(Err(join_error)) = joined {
                    if let Some(unit_index) = task_units.get(&join_error.id()).copied() {
                        warn!(unit_index, error = %join_error, "unit task ended abnormally");
                        record(
                            &inner.progress,
                            operation_id,
                            unit_index,
                            UnitOutcome::failure(FailureKind::Internal, join_error.to_string()),
                        );
                    }
                }
                if tasks.is_empty() {
                    // Every task is done; anything still pending never reported.
                    if let Ok(snapshot) = inner.progress.get(operation_id) {
                        for unit_index in snapshot.pending_units() {
                            record(
                                &inner.progress,
                                operation_id,
                                unit_index,
                                UnitOutcome::failure(FailureKind::Internal, "unit produced no outcome"),
                            );
                        }
                    }
                }
            }
        }
    };

    // Units have all recorded; let their tasks wind down.
    while tasks.join_next().await.is_some() {}

    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "operation lost before finalization");
            inner.running.lock().remove(&operation_id);
            return;
        }
    };

    let status = snapshot.final_status();
    let artifact = GenerationArtifact::assemble(&snapshot, &request, status);
    let saved = inner.cache.save(&artifact).await;

    match inner
        .progress
        .finalize(operation_id, artifact, saved.is_persisted())
    {
        Ok(snapshot) => info!(
            status = %snapshot.status,
            completed = snapshot.completed_units,
            failed = snapshot.failed_units,
            persisted = snapshot.persisted,
            "operation finished"
        ),
        Err(e) => warn!(error = %e, "failed to finalize operation"),
    }

    inner.running.lock().remove(&operation_id);
}
