//! Artifact persistence with an in-memory fallback
//!
//! The [`FallbackCache`] writes through to a durable [`ArtifactStore`] when
//! one is configured. A failed or missing durable store never fails the
//! operation; the artifact is kept in memory instead and the save reports
//! [`SaveOutcome::MemoryOnly`].

pub mod connection;
pub mod error;
pub mod memory;
pub mod message_db;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::artifact::GenerationArtifact;
use crate::progress::types::OperationId;

pub use connection::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::MemoryArtifactStore;
pub use message_db::MessageDbArtifactStore;

/// A place artifacts can be saved to and loaded from
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save(&self, artifact: &GenerationArtifact) -> Result<()>;

    async fn load(&self, operation_id: OperationId) -> Result<Option<GenerationArtifact>>;

    fn name(&self) -> &str;
}

/// Where a saved artifact ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Persisted,
    MemoryOnly,
}

impl SaveOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, SaveOutcome::Persisted)
    }
}

pub struct FallbackCache {
    durable: Option<Arc<dyn ArtifactStore>>,
    memory: MemoryArtifactStore,
}

impl FallbackCache {
    pub fn new(durable: Option<Arc<dyn ArtifactStore>>, memory_capacity: usize) -> Self {
        Self {
            durable,
            memory: MemoryArtifactStore::new(memory_capacity),
        }
    }

    pub fn memory_only(memory_capacity: usize) -> Self {
        Self::new(None, memory_capacity)
    }

    pub fn has_durable_store(&self) -> bool {
        self.durable.is_some()
    }

    pub fn memory(&self) -> &MemoryArtifactStore {
        &self.memory
    }

    /// Save the artifact; never fails
    pub async fn save(&self, artifact: &GenerationArtifact) -> SaveOutcome {
        if let Some(durable) = &self.durable {
            match durable.save(artifact).await {
                Ok(()) => return SaveOutcome::Persisted,
                Err(e) => warn!(
                    operation_id = %artifact.operation_id,
                    store = durable.name(),
                    error = %e,
                    "durable save failed, keeping artifact in memory"
                ),
            }
        }
        self.memory.insert(artifact.clone());
        SaveOutcome::MemoryOnly
    }

    /// Load an artifact from memory, then from the durable store
    pub async fn load(&self, operation_id: OperationId) -> Result<GenerationArtifact> {
        if let Some(artifact) = self.memory.get(operation_id) {
            return Ok(artifact.as_ref().clone());
        }
        if let Some(durable) = &self.durable {
            if let Some(artifact) = durable.load(operation_id).await? {
                return Ok(artifact);
            }
        }
        Err(StoreError::NotFound(operation_id))
    }
}
