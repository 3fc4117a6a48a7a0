//! Fan-out of validated snapshots to registered subscribers.
//!
//! Every subscriber owns a bounded queue drained by its own worker task, so
//! a slow or failing subscriber never stalls the receive loop or its peers.
//! Snapshots are handed to subscribers in registration order; if a queue is
//! full the newest delivery for that subscriber is dropped.

use algo_cost_core::{Snapshot, SnapshotSubscriber};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Handle returned by registration, used to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of handing one snapshot to every subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Deliveries queued for a worker
    pub queued: usize,
    /// Deliveries dropped on a full or closed queue
    pub dropped: usize,
}

struct SubscriberSlot {
    id: SubscriberId,
    name: String,
    tx: mpsc::Sender<Arc<Snapshot>>,
    worker: JoinHandle<()>,
}

/// Ordered set of subscribers with one delivery worker each.
///
/// Registration spawns a Tokio task, so it must run inside a runtime.
pub struct SubscriberRegistry {
    queue_capacity: usize,
    call_timeout: Duration,
    next_id: u64,
    slots: Vec<SubscriberSlot>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    ///
    /// `queue_capacity` is clamped to at least 1.
    #[must_use]
    pub fn new(queue_capacity: usize, call_timeout: Duration) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            call_timeout,
            next_id: 0,
            slots: Vec::new(),
        }
    }

    /// Adds a subscriber after all existing ones and starts its worker.
    pub fn register(&mut self, subscriber: Arc<dyn SnapshotSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let name = subscriber.name().to_string();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let worker = tokio::spawn(run_worker(subscriber, rx, self.call_timeout));

        debug!(subscriber = %name, id = %id, "Registered snapshot subscriber");
        self.slots.push(SubscriberSlot {
            id,
            name,
            tx,
            worker,
        });
        id
    }

    /// Removes a subscriber. Its worker finishes queued deliveries and exits.
    ///
    /// Returns false if the id is unknown.
    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        match self.slots.iter().position(|slot| slot.id == id) {
            Some(index) => {
                let slot = self.slots.remove(index);
                debug!(subscriber = %slot.name, id = %id, "Unregistered snapshot subscriber");
                true
            }
            None => false,
        }
    }

    /// Queues `snapshot` for every subscriber in registration order.
    pub fn dispatch(&self, snapshot: &Arc<Snapshot>) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for slot in &self.slots {
            match slot.tx.try_send(Arc::clone(snapshot)) {
                Ok(()) => outcome.queued += 1,
                Err(TrySendError::Full(_)) => {
                    outcome.dropped += 1;
                    warn!(
                        subscriber = %slot.name,
                        capacity = self.queue_capacity,
                        "Subscriber queue full, dropping snapshot"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    outcome.dropped += 1;
                    warn!(subscriber = %slot.name, "Subscriber worker gone, dropping snapshot");
                }
            }
        }

        outcome
    }

    /// Subscriber names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name.clone()).collect()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Removes every subscriber and returns their worker handles.
    ///
    /// Dropping the queues lets each worker drain what is already queued and
    /// exit; abort the handles to stop them immediately.
    pub fn clear(&mut self) -> Vec<JoinHandle<()>> {
        self.slots.drain(..).map(|slot| slot.worker).collect()
    }
}

async fn run_worker(
    subscriber: Arc<dyn SnapshotSubscriber>,
    mut rx: mpsc::Receiver<Arc<Snapshot>>,
    call_timeout: Duration,
) {
    while let Some(snapshot) = rx.recv().await {
        let call = AssertUnwindSafe(subscriber.on_snapshot(snapshot)).catch_unwind();

        match tokio::time::timeout(call_timeout, call).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                warn!(subscriber = %subscriber.name(), error = %e, "Subscriber failed to process snapshot");
            }
            Ok(Err(_)) => {
                error!(subscriber = %subscriber.name(), "Subscriber panicked while processing snapshot");
            }
            Err(_) => {
                warn!(
                    subscriber = %subscriber.name(),
                    timeout_ms = call_timeout.as_millis() as u64,
                    "Subscriber timed out, snapshot abandoned"
                );
            }
        }
    }

    debug!(subscriber = %subscriber.name(), "Subscriber worker stopped");
}
