//! Per-entity generation exclusivity.
//!
//! When several requests need a thumbnail regenerated for the same entity at
//! the same time, only the first runs the generation. Everyone else waits
//! for that single result, success or failure.
//!
//! ```text
//! get(x1) ─┐
//!          │                                   spawned
//! get(x1) ─┼──► GenerationCoordinator ───────► generation
//!          │          │                            │
//! get(x1) ─┘          ▼                            ▼
//!               [all three receive ◄───────── one render]
//!                the same pair]
//! ```
//!
//! Slots live in a `DashMap` keyed by entity id. A slot is created by the
//! first caller and removed as soon as its generation finishes, so idle
//! entities cost nothing. The generation runs on its own task: a caller that
//! gives up waiting does not cancel it for the others.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::catalog::EntityId;
use crate::thumbnail::types::{ThumbnailError, ThumbnailPair};

/// Outcome of one generation, shared by every coordinated caller.
pub type GenerationResult = Result<Arc<ThumbnailPair>, ThumbnailError>;

/// Registry of in-flight generations.
pub struct GenerationCoordinator {
    in_flight: DashMap<EntityId, broadcast::Sender<GenerationResult>>,
    total_requests: AtomicU64,
    coalesced_requests: AtomicU64,
    new_requests: AtomicU64,
}

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Calls to `run_exclusive`.
    pub total_requests: u64,
    /// Calls that waited on another caller's generation.
    pub coalesced_requests: u64,
    /// Calls that started a generation.
    pub new_requests: u64,
}

impl CoordinatorStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

impl GenerationCoordinator {
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            total_requests: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            new_requests: AtomicU64::new(0),
        }
    }

    /// Run `generate` for `id` unless a generation for `id` is already in
    /// flight, in which case wait for and return that generation's result.
    ///
    /// `generate` is only called by the caller that claims the slot. Its
    /// future runs on a separate task and always runs to completion.
    pub async fn run_exclusive<F, Fut>(
        self: &Arc<Self>,
        id: EntityId,
        generate: F,
    ) -> GenerationResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GenerationResult> + Send + 'static,
    {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        // Entry API gives an atomic check-and-insert. The shard lock is
        // released before anything is awaited.
        let claimed = match self.in_flight.entry(id.clone()) {
            Entry::Occupied(entry) => Err(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                // One result is ever sent per slot.
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                Ok(tx)
            }
        };
        let sender = match claimed {
            Ok(sender) => sender,
            Err(rx) => {
                self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
                debug!(entity = %id, "Waiting for in-flight generation");
                return Self::wait(id, rx).await;
            }
        };
        self.new_requests.fetch_add(1, Ordering::Relaxed);
        debug!(
            entity = %id,
            in_flight_count = self.in_flight.len(),
            "Starting generation"
        );

        let slot = Slot {
            coordinator: Arc::clone(self),
            id: id.clone(),
            sender: Some(sender),
        };
        let generation = generate();
        let handle = tokio::spawn(async move {
            let result = generation.await;
            slot.complete(&result);
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(ThumbnailError::generation(
                &id,
                ThumbnailError::Aborted(e.to_string()),
            )),
        }
    }

    async fn wait(
        id: EntityId,
        mut rx: broadcast::Receiver<GenerationResult>,
    ) -> GenerationResult {
        match rx.recv().await {
            Ok(result) => result,
            Err(e) => Err(ThumbnailError::generation(
                &id,
                ThumbnailError::Aborted(e.to_string()),
            )),
        }
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            new_requests: self.new_requests.load(Ordering::Relaxed),
        }
    }

    /// Number of generations currently running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// True if a generation for `id` is currently running.
    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_requests = stats.total_requests,
            coalesced = stats.coalesced_requests,
            new_requests = stats.new_requests,
            in_flight = self.in_flight_count(),
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "Generation coalescing statistics"
        );
    }
}

impl Default for GenerationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of one in-flight slot.
///
/// Dropping a slot that never completed (the generation panicked) still
/// removes the map entry; waiters then see the channel close.
struct Slot {
    coordinator: Arc<GenerationCoordinator>,
    id: EntityId,
    sender: Option<broadcast::Sender<GenerationResult>>,
}

impl Slot {
    /// Free the slot, then hand `result` to every waiter.
    fn complete(mut self, result: &GenerationResult) {
        self.coordinator.in_flight.remove(&self.id);
        if let Some(tx) = self.sender.take() {
            let waiters = tx.receiver_count();
            let _ = tx.send(result.clone());
            if waiters > 0 {
                debug!(entity = %self.id, waiters, "Broadcast generation result");
            }
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if self.sender.take().is_some() {
            self.coordinator.in_flight.remove(&self.id);
            warn!(entity = %self.id, "Generation slot released without a result");
        }
    }
}
