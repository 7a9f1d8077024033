//! Bounded in-memory artifact cache

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::artifact::GenerationArtifact;
use crate::progress::types::OperationId;

use super::error::Result;
use super::ArtifactStore;

struct MemoryInner {
    artifacts: HashMap<OperationId, Arc<GenerationArtifact>>,
    /// Insertion order, oldest first
    order: VecDeque<OperationId>,
}

/// Keeps artifacts for the life of the process
///
/// Holds at most `capacity` artifacts; the oldest insertion is dropped first.
pub struct MemoryArtifactStore {
    inner: Mutex<MemoryInner>,
    capacity: usize,
}

impl MemoryArtifactStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                artifacts: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&self, artifact: GenerationArtifact) {
        let id = artifact.operation_id;
        let mut inner = self.inner.lock();
        if inner.artifacts.insert(id, Arc::new(artifact)).is_none() {
            inner.order.push_back(id);
        }
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.artifacts.remove(&oldest);
            }
        }
    }

    pub fn get(&self, operation_id: OperationId) -> Option<Arc<GenerationArtifact>> {
        self.inner.lock().artifacts.get(&operation_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn save(&self, artifact: &GenerationArtifact) -> Result<()> {
        self.insert(artifact.clone());
        Ok(())
    }

    async fn load(&self, operation_id: OperationId) -> Result<Option<GenerationArtifact>> {
        Ok(self.get(operation_id).map(|artifact| artifact.as_ref().clone()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{ContentKind, GenerationRequest};
    use crate::progress::types::{OperationSnapshot, OperationStatus};

    fn artifact() -> GenerationArtifact {
        let snapshot = OperationSnapshot::new(OperationId::new(), ContentKind::Quiz, "Rust", 0);
        let request = GenerationRequest::topic(ContentKind::Quiz, "Rust", 1);
        GenerationArtifact::assemble(&snapshot, &request, OperationStatus::Completed)
    }

    #[test]
    fn test_oldest_dropped_at_capacity() {
        let store = MemoryArtifactStore::new(2);
        let first = artifact();
        let second = artifact();
        let third = artifact();
        let (a, b, c) = (first.operation_id, second.operation_id, third.operation_id);

        store.insert(first);
        store.insert(second);
        store.insert(third);

        assert_eq!(store.len(), 2);
        assert!(store.get(a).is_none());
        assert!(store.get(b).is_some());
        assert!(store.get(c).is_some());
    }

    #[test]
    fn test_reinsert_does_not_duplicate_order() {
        let store = MemoryArtifactStore::new(2);
        let first = artifact();
        let id = first.operation_id;
        store.insert(first.clone());
        store.insert(first);
        store.insert(artifact());
        assert!(store.get(id).is_some());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_trait_round_trip() {
        let store = MemoryArtifactStore::new(4);
        let saved = artifact();
        store.save(&saved).await.unwrap();
        let loaded = store.load(saved.operation_id).await.unwrap();
        assert_eq!(loaded, Some(saved));
        assert_eq!(store.load(OperationId::new()).await.unwrap(), None);
    }
}
