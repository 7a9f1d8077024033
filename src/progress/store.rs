//! In-memory progress store
//!
//! One entry per operation. Each entry has its own lock, so units of
//! different operations never contend, and a `watch` channel that carries
//! the latest snapshot to any number of subscribers.

use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::artifact::GenerationArtifact;
use crate::partition::ContentKind;

use super::error::ProgressError;
use super::types::{OperationId, OperationSnapshot, OperationStatus, UnitOutcome};

pub type Result<T> = std::result::Result<T, ProgressError>;

struct EntryState {
    snapshot: OperationSnapshot,
    artifact: Option<Arc<GenerationArtifact>>,
    terminal_at: Option<Instant>,
}

struct Entry {
    state: Mutex<EntryState>,
    sender: watch::Sender<OperationSnapshot>,
}

impl Entry {
    fn is_expired(&self, now: Instant, retention: Duration) -> bool {
        self.state
            .lock()
            .terminal_at
            .is_some_and(|at| now.saturating_duration_since(at) >= retention)
    }
}

struct StoreInner {
    entries: RwLock<HashMap<OperationId, Arc<Entry>>>,
    retention: Duration,
}

/// Shared handle to the progress store
#[derive(Clone)]
pub struct ProgressStore {
    inner: Arc<StoreInner>,
}

impl ProgressStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(HashMap::new()),
                retention,
            }),
        }
    }

    pub fn retention(&self) -> Duration {
        self.inner.retention
    }

    /// Register a new operation in the `queued` state
    pub fn create(
        &self,
        operation_id: OperationId,
        kind: ContentKind,
        topic: impl Into<String>,
        total_units: usize,
    ) -> Result<OperationSnapshot> {
        let snapshot = OperationSnapshot::new(operation_id, kind, topic, total_units);
        let (sender, _) = watch::channel(snapshot.clone());
        let entry = Arc::new(Entry {
            state: Mutex::new(EntryState {
                snapshot: snapshot.clone(),
                artifact: None,
                terminal_at: None,
            }),
            sender,
        });

        let mut entries = self.inner.entries.write();
        if entries.contains_key(&operation_id) {
            return Err(ProgressError::AlreadyExists(operation_id));
        }
        entries.insert(operation_id, entry);
        Ok(snapshot)
    }

    /// Look up a live entry, evicting it on the spot if its retention has lapsed
    fn entry(&self, operation_id: OperationId) -> Result<Arc<Entry>> {
        let entry = self
            .inner
            .entries
            .read()
            .get(&operation_id)
            .cloned()
            .ok_or(ProgressError::NotFound(operation_id))?;

        if entry.is_expired(Instant::now(), self.inner.retention) {
            let mut entries = self.inner.entries.write();
            if entries
                .get(&operation_id)
                .is_some_and(|current| Arc::ptr_eq(current, &entry))
            {
                entries.remove(&operation_id);
            }
            debug!(%operation_id, "evicted expired operation on read");
            return Err(ProgressError::NotFound(operation_id));
        }
        Ok(entry)
    }

    /// Apply a change under the entry lock; broadcast when `change` reports a modification
    fn mutate<F>(&self, operation_id: OperationId, change: F) -> Result<OperationSnapshot>
    where
        F: FnOnce(&mut EntryState) -> Result<bool>,
    {
        let entry = self.entry(operation_id)?;
        let mut state = entry.state.lock();
        if change(&mut state)? {
            state.snapshot.touch();
            entry.sender.send_replace(state.snapshot.clone());
        }
        Ok(state.snapshot.clone())
    }

    /// Move a queued operation to `processing`
    pub fn mark_processing(&self, operation_id: OperationId) -> Result<()> {
        self.mutate(operation_id, |state| match state.snapshot.status {
            OperationStatus::Queued => {
                state.snapshot.status = OperationStatus::Processing;
                Ok(true)
            }
            OperationStatus::Processing => Ok(false),
            _ => Err(ProgressError::AlreadyTerminal(operation_id)),
        })
        .map(|_| ())
    }

    /// Record the outcome of one unit
    ///
    /// Each unit may be recorded once; a second attempt is rejected and
    /// leaves the counters untouched.
    pub fn record_unit(
        &self,
        operation_id: OperationId,
        unit_index: usize,
        outcome: UnitOutcome,
    ) -> Result<OperationSnapshot> {
        self.mutate(operation_id, |state| {
            let snapshot = &mut state.snapshot;
            if snapshot.status.is_terminal() {
                return Err(ProgressError::AlreadyTerminal(operation_id));
            }
            let total_units = snapshot.total_units;
            let slot = snapshot
                .results
                .get_mut(unit_index)
                .ok_or(ProgressError::UnitOutOfRange {
                    operation_id,
                    unit_index,
                    total_units,
                })?;
            if slot.is_some() {
                return Err(ProgressError::AlreadyRecorded {
                    operation_id,
                    unit_index,
                });
            }

            if outcome.is_success() {
                snapshot.completed_units += 1;
            } else {
                snapshot.failed_units += 1;
            }
            *slot = Some(outcome);
            Ok(true)
        })
    }

    /// Note a structural failure; the operation will settle as `failed`
    ///
    /// The first reason wins. Units still running keep recording.
    pub fn fail_operation(&self, operation_id: OperationId, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        self.mutate(operation_id, |state| {
            if state.snapshot.status.is_terminal() {
                return Err(ProgressError::AlreadyTerminal(operation_id));
            }
            if state.snapshot.error.is_some() {
                return Ok(false);
            }
            state.snapshot.error = Some(reason);
            Ok(true)
        })
        .map(|_| ())
    }

    /// Attach the artifact and move the operation to its terminal status
    ///
    /// Starts the retention window.
    pub fn finalize(
        &self,
        operation_id: OperationId,
        artifact: GenerationArtifact,
        persisted: bool,
    ) -> Result<OperationSnapshot> {
        self.mutate(operation_id, |state| {
            if state.snapshot.status.is_terminal() {
                return Err(ProgressError::AlreadyTerminal(operation_id));
            }
            if !state.snapshot.is_resolved() {
                return Err(ProgressError::Unresolved {
                    operation_id,
                    pending: state.snapshot.pending_units().len(),
                });
            }
            state.snapshot.status = state.snapshot.final_status();
            state.snapshot.persisted = persisted;
            state.artifact = Some(Arc::new(artifact));
            state.terminal_at = Some(Instant::now());
            Ok(true)
        })
    }

    pub fn get(&self, operation_id: OperationId) -> Result<OperationSnapshot> {
        let entry = self.entry(operation_id)?;
        let snapshot = entry.state.lock().snapshot.clone();
        Ok(snapshot)
    }

    /// Final artifact, present once the operation is terminal
    pub fn artifact(&self, operation_id: OperationId) -> Result<Option<Arc<GenerationArtifact>>> {
        let entry = self.entry(operation_id)?;
        let artifact = entry.state.lock().artifact.clone();
        Ok(artifact)
    }

    /// Receiver that always holds the latest snapshot
    pub fn subscribe(&self, operation_id: OperationId) -> Result<watch::Receiver<OperationSnapshot>> {
        Ok(self.entry(operation_id)?.sender.subscribe())
    }

    /// Resolve once every unit of the operation has an outcome
    pub async fn wait_resolved(&self, operation_id: OperationId) -> Result<OperationSnapshot> {
        let mut receiver = self.subscribe(operation_id)?;
        let snapshot = receiver
            .wait_for(OperationSnapshot::is_resolved)
            .await
            .map_err(|_| ProgressError::NotFound(operation_id))?
            .clone();
        Ok(snapshot)
    }

    /// Evict a terminal operation immediately
    pub fn acknowledge(&self, operation_id: OperationId) -> Result<()> {
        let entry = self.entry(operation_id)?;
        if !entry.state.lock().snapshot.status.is_terminal() {
            return Err(ProgressError::NotTerminal(operation_id));
        }
        self.inner.entries.write().remove(&operation_id);
        debug!(%operation_id, "operation acknowledged");
        Ok(())
    }

    /// Remove every terminal operation whose retention window has passed
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let retention = self.inner.retention;
        let mut entries = self.inner.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, retention));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodically evict expired operations until `cancel` fires
    pub fn spawn_reaper(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = store.evict_expired();
                        if evicted > 0 {
                            info!(evicted, remaining = store.len(), "evicted expired operations");
                        }
                    }
                }
            }
        })
    }
}
