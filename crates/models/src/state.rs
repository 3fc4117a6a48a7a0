//! Atomically published model parameters.

use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;

/// Holds the current parameter set of a trainable model.
///
/// Readers clone the `Arc` under a short read lock and compute without
/// holding it, so inference never waits for a fit. A fit runs off-lock and
/// publishes a complete new parameter set with a single write, so readers
/// see either the old or the new set and never a mix. `None` means the
/// model is untrained.
#[derive(Debug)]
pub struct ModelCell<P> {
    params: RwLock<Option<Arc<P>>>,
    writer: Mutex<()>,
}

impl<P> Default for ModelCell<P> {
    fn default() -> Self {
        Self {
            params: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }
}

impl<P> ModelCell<P> {
    /// Creates an empty (untrained) cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current parameters, if trained.
    #[must_use]
    pub fn load(&self) -> Option<Arc<P>> {
        self.params.read().clone()
    }

    /// Replaces the parameters in one step.
    pub fn publish(&self, params: P) {
        *self.params.write() = Some(Arc::new(params));
    }

    /// Reverts to untrained.
    pub fn clear(&self) {
        *self.params.write() = None;
    }

    /// Returns true if parameters are published.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.params.read().is_some()
    }

    /// Serialises writers. Hold the guard across fit and publish.
    pub fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }
}
