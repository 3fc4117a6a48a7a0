use crate::fee_schedule::FeeSchedule;
use crate::order::OrderParams;
use serde::{Deserialize, Serialize};

/// Default order book feed for OKX BTC-USDT perpetual swaps.
pub const DEFAULT_FEED_URL: &str = "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook/okx/BTC-USDT-SWAP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub order: OrderParams,
    pub fees: FeeSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub initial_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub ping_interval_secs: u64,
    pub connect_timeout_secs: u64,
    pub subscriber_queue_capacity: usize,
    pub subscriber_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            initial_reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 30_000,
            ping_interval_secs: 30,
            connect_timeout_secs: 10,
            subscriber_queue_capacity: 64,
            subscriber_timeout_ms: 250,
        }
    }
}
