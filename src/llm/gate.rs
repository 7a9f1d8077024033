//! Process-wide concurrency gate for outbound provider calls
//!
//! Every provider invocation holds a [`GatePermit`] for its whole duration.
//! The gate is a counting semaphore plus bookkeeping so callers can observe
//! the number of calls in flight and wait for them to drain on shutdown.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use thiserror::Error;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("concurrency gate is closed")]
    Closed,
}

#[derive(Debug)]
struct GateInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    idle: Notify,
}

/// Counting gate shared by every operation in the process
#[derive(Clone)]
pub struct ConcurrencyGate {
    inner: Arc<GateInner>,
}

/// Held for the duration of one provider call
///
/// Dropping the permit releases the slot, including on error, timeout and
/// task cancellation.
#[derive(Debug)]
pub struct GatePermit {
    gate: Arc<GateInner>,
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// # Panics
    ///
    /// Panics if `capacity` is zero; configuration validation rejects that
    /// before a gate is built.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "gate capacity must be at least 1");
        Self {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Wait for a free slot
    ///
    /// Waiters are served in FIFO order. Fails only once the gate is closed.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);

        Ok(GatePermit {
            gate: self.inner.clone(),
            _permit: permit,
        })
    }

    /// Refuse new acquisitions; callers already waiting fail with [`GateError::Closed`]
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Highest number of simultaneously held permits since the gate was built
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    /// Resolve once no permit is held
    pub async fn drain(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is released, so the counter
        // never exceeds capacity.
        if self.gate.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.gate.idle.notify_waiters();
        }
    }
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("capacity", &self.capacity())
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_acquire_tracks_in_flight() {
        let gate = ConcurrencyGate::new(2);
        let first = gate.acquire().await.unwrap();
        let second = gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 2);
        assert_eq!(gate.available(), 0);

        drop(first);
        assert_eq!(gate.in_flight(), 1);
        drop(second);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_when_full() {
        let gate = ConcurrencyGate::new(1);
        let held = gate.acquire().await.unwrap();

        let mut waiter = task::spawn(gate.acquire());
        assert_pending!(waiter.poll());

        drop(held);
        assert!(waiter.is_woken());
        let permit = assert_ready!(waiter.poll());
        assert!(permit.is_ok());
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let gate = ConcurrencyGate::new(1);
        let _held = gate.acquire().await.unwrap();

        let mut waiter = task::spawn(gate.acquire());
        assert_pending!(waiter.poll());

        gate.close();
        assert!(gate.is_closed());
        let result = assert_ready!(waiter.poll());
        assert_eq!(result.err(), Some(GateError::Closed));
    }

    #[tokio::test]
    async fn test_drain_resolves_after_release() {
        let gate = ConcurrencyGate::new(2);
        gate.drain().await;

        let permit = gate.acquire().await.unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(permit);
        });

        tokio::time::timeout(Duration::from_secs(1), gate.drain())
            .await
            .expect("drain should finish once the permit is dropped");
        assert_eq!(gate.in_flight(), 0);
        release.await.unwrap();
    }

    #[test]
    #[should_panic(expected = "gate capacity must be at least 1")]
    fn test_zero_capacity_panics() {
        let _ = ConcurrencyGate::new(0);
    }
}
