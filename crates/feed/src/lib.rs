//! Order book snapshot feed.
//!
//! Connects to a WebSocket endpoint that pushes full order book snapshots,
//! validates each message, and fans the result out to registered
//! [`SnapshotSubscriber`](algo_cost_core::SnapshotSubscriber)s. Lost
//! connections are re-established with exponential backoff.

pub mod backoff;
pub mod dispatch;
pub mod error;
pub mod stats;
pub mod websocket;
pub mod wire;

pub use backoff::Backoff;
pub use dispatch::{DispatchOutcome, SubscriberId, SubscriberRegistry};
pub use error::FeedError;
pub use stats::FeedStats;
pub use websocket::{ConnectionState, StreamConfig, StreamingClient};
pub use wire::{parse_snapshot, parse_timestamp};
