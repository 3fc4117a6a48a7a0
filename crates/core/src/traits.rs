use crate::snapshot::Snapshot;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Consumer of validated order book snapshots.
///
/// Invoked once per snapshot, in wire order, from a worker owned by the
/// feed. Errors are logged by the dispatcher and never reach the receive
/// loop or other subscribers.
#[async_trait]
pub trait SnapshotSubscriber: Send + Sync {
    async fn on_snapshot(&self, snapshot: Arc<Snapshot>) -> Result<()>;

    /// Name used in logs.
    fn name(&self) -> &str;
}
