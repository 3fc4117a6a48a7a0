//! Resilient WebSocket client for order book snapshot streaming.
//!
//! The client holds one long-lived connection to a feed URL, validates each
//! inbound message into a [`Snapshot`] and hands it to every registered
//! subscriber.
//!
//! # Architecture
//!
//! ```text
//! StreamingClient::connect()
//!        │
//!        ├─► Opens the first connection (errors surface to the caller)
//!        │
//!        └─► Spawns the session task
//!            ├─► Receive loop: parse, validate, dispatch
//!            ├─► Ping keepalive
//!            └─► On transport failure: backoff, reconnect, resume
//! ```
//!
//! Malformed messages are logged and dropped one at a time. Transport
//! failures after the first connect never reach the caller; the session
//! retries with exponential backoff until [`StreamingClient::close`].
//!
//! # Example
//!
//! ```no_run
//! use algo_cost_feed::{StreamConfig, StreamingClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = StreamingClient::new(StreamConfig::default());
//!     // client.register(Arc::new(my_subscriber));
//!     client.connect().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.close().await;
//!     Ok(())
//! }
//! ```

use crate::backoff::Backoff;
use crate::dispatch::{SubscriberId, SubscriberRegistry};
use crate::error::FeedError;
use crate::stats::FeedStats;
use crate::wire;
use algo_cost_core::{FeedConfig, SnapshotSubscriber, DEFAULT_FEED_URL};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle as observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or the first connect failed.
    Disconnected,
    /// First connection attempt in flight.
    Connecting,
    /// Session running on a live connection.
    Connected,
    /// Transport lost; waiting out backoff or retrying.
    Reconnecting,
    /// Closed by the caller. Terminal.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Configuration for the streaming client.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Feed URL (ws:// or wss://).
    pub url: String,
    /// First reconnection delay.
    pub initial_reconnect_delay: Duration,
    /// Reconnection delay cap.
    pub max_reconnect_delay: Duration,
    /// Keepalive ping period. A connection with no inbound frame (pongs
    /// included) for two periods is treated as lost.
    pub ping_interval: Duration,
    /// Bound on each connection attempt.
    pub connect_timeout: Duration,
    /// Per-subscriber queue capacity.
    pub subscriber_queue_capacity: usize,
    /// Bound on a single subscriber call.
    pub subscriber_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            ping_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            subscriber_queue_capacity: 64,
            subscriber_timeout: Duration::from_millis(250),
        }
    }
}

impl StreamConfig {
    /// Creates a config for `url` with default timings.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the backoff bounds.
    #[must_use]
    pub fn reconnect_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_reconnect_delay = initial;
        self.max_reconnect_delay = max;
        self
    }

    /// Sets the subscriber queue capacity and call timeout.
    #[must_use]
    pub fn subscriber_limits(mut self, capacity: usize, call_timeout: Duration) -> Self {
        self.subscriber_queue_capacity = capacity;
        self.subscriber_timeout = call_timeout;
        self
    }
}

impl From<&FeedConfig> for StreamConfig {
    fn from(config: &FeedConfig) -> Self {
        Self {
            url: config.url.clone(),
            initial_reconnect_delay: Duration::from_millis(config.initial_reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(config.max_reconnect_delay_ms),
            ping_interval: Duration::from_secs(config.ping_interval_secs.max(1)),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            subscriber_queue_capacity: config.subscriber_queue_capacity,
            subscriber_timeout: Duration::from_millis(config.subscriber_timeout_ms),
        }
    }
}

struct Inner {
    config: StreamConfig,
    registry: RwLock<SubscriberRegistry>,
    stats: Mutex<FeedStats>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    session: AsyncMutex<Option<JoinHandle<()>>>,
}

/// Handle to a streaming order book feed.
///
/// Cloning yields another handle to the same client. The session keeps
/// running until [`StreamingClient::close`] is called.
#[derive(Clone)]
pub struct StreamingClient {
    inner: Arc<Inner>,
}

impl StreamingClient {
    /// Creates a disconnected client.
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        let registry =
            SubscriberRegistry::new(config.subscriber_queue_capacity, config.subscriber_timeout);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                config,
                registry: RwLock::new(registry),
                stats: Mutex::new(FeedStats::default()),
                state_tx,
                shutdown_tx,
                session: AsyncMutex::new(None),
            }),
        }
    }

    /// Creates a client for `url` and connects it.
    ///
    /// # Errors
    /// Returns [`FeedError`] if the first connection fails.
    pub async fn connect_to(url: impl Into<String>) -> Result<Self, FeedError> {
        let client = Self::new(StreamConfig::with_url(url));
        client.connect().await?;
        Ok(client)
    }

    /// Appends a subscriber after all existing ones.
    ///
    /// Returns `None` without storing the subscriber if the client is closed.
    /// Must be called inside a Tokio runtime.
    pub fn register(&self, subscriber: Arc<dyn SnapshotSubscriber>) -> Option<SubscriberId> {
        if self.is_closed() {
            debug!(subscriber = %subscriber.name(), "Client closed, ignoring registration");
            return None;
        }
        Some(self.inner.registry.write().register(subscriber))
    }

    /// Removes a subscriber. Returns false if the id is unknown.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.inner.registry.write().unregister(id)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    /// Opens the connection and starts the session.
    ///
    /// # Errors
    /// - [`FeedError::Closed`] after [`StreamingClient::close`]
    /// - [`FeedError::AlreadyConnected`] while a session is running
    /// - connection errors if the first attempt fails; the client returns to
    ///   [`ConnectionState::Disconnected`] and `connect` may be retried
    pub async fn connect(&self) -> Result<(), FeedError> {
        let claimed = self.inner.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return match self.state() {
                ConnectionState::Closed => Err(FeedError::Closed),
                _ => Err(FeedError::AlreadyConnected),
            };
        }

        info!(url = %self.inner.config.url, "Connecting to order book feed");

        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();
        let opened = tokio::select! {
            result = open_stream(&self.inner.config) => result,
            () = shutdown_requested(&mut shutdown_rx) => Err(FeedError::Closed),
        };

        let ws = match opened {
            Ok(ws) => ws,
            Err(e) => {
                self.inner.state_tx.send_if_modified(|state| {
                    if *state == ConnectionState::Connecting {
                        *state = ConnectionState::Disconnected;
                        true
                    } else {
                        false
                    }
                });
                error!(error = %e, "Initial connection failed");
                return Err(e);
            }
        };

        info!("Order book feed connected");
        self.inner.set_state(ConnectionState::Connected);

        let handle = tokio::spawn(run_session(Arc::clone(&self.inner), ws));
        *self.inner.session.lock().await = Some(handle);

        if self.is_closed() {
            // close() ran while the first connection was opening
            self.close().await;
            return Err(FeedError::Closed);
        }
        Ok(())
    }

    /// Stops the session, releases the transport, and stops every
    /// subscriber worker, abandoning deliveries still queued.
    ///
    /// Idempotent. Interrupts a pending backoff sleep immediately. Concurrent
    /// callers all return only once teardown has finished.
    pub async fn close(&self) {
        self.inner.shutdown_tx.send_replace(true);

        // Held for the whole teardown so a concurrent close waits on it.
        let mut session = self.inner.session.lock().await;
        if let Some(handle) = session.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session task ended abnormally");
            }
        }

        let workers = self.inner.registry.write().clear();
        let subscribers = workers.len();
        for worker in &workers {
            worker.abort();
        }
        for worker in workers {
            // Cancelled workers report a JoinError; nothing to act on.
            let _ = worker.await;
        }

        let previous = self.inner.state_tx.send_replace(ConnectionState::Closed);
        if previous != ConnectionState::Closed {
            info!(subscribers, "Streaming client closed");
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Snapshot of the running counters.
    #[must_use]
    pub fn stats(&self) -> FeedStats {
        self.inner.stats.lock().clone()
    }

    /// The client's configuration.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }

    fn is_closed(&self) -> bool {
        *self.inner.shutdown_tx.borrow()
    }
}

impl Inner {
    fn set_state(&self, next: ConnectionState) {
        self.state_tx.send_if_modified(|state| {
            // Closed is terminal
            if *state == next || *state == ConnectionState::Closed {
                false
            } else {
                debug!(from = %state, to = %next, "Connection state changed");
                *state = next;
                true
            }
        });
    }

    fn handle_frame(&self, text: &str) {
        self.stats.lock().frame_received();

        match wire::parse_snapshot(text) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let outcome = self.registry.read().dispatch(&snapshot);
                self.stats.lock().snapshot_dispatched(outcome.dropped);
                trace!(
                    symbol = %snapshot.symbol,
                    asks = snapshot.ask_levels(),
                    bids = snapshot.bid_levels(),
                    queued = outcome.queued,
                    "Dispatched snapshot"
                );
            }
            Err(e) => {
                self.stats.lock().validation_failed();
                warn!(error = %e, "Dropping invalid order book message");
            }
        }
    }
}

// ============================================================================
// Session Loop
// ============================================================================

/// Why a receive loop stopped.
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// Resolves once shutdown has been requested.
///
/// Wraps `wait_for` so the borrowed channel value is released before the
/// caller's next await.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn open_stream(config: &StreamConfig) -> Result<WsStream, FeedError> {
    let url = url::Url::parse(&config.url)?;

    let (ws_stream, _response) = timeout(config.connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| FeedError::ConnectTimeout(config.connect_timeout))?
        .map_err(|e| FeedError::Connect(e.to_string()))?;

    Ok(ws_stream)
}

/// Runs until shutdown, reconnecting after every transport failure.
async fn run_session(inner: Arc<Inner>, ws: WsStream) {
    let config = &inner.config;
    let mut shutdown_rx = inner.shutdown_tx.subscribe();
    let mut backoff = Backoff::new(config.initial_reconnect_delay, config.max_reconnect_delay);
    let mut ws = ws;

    loop {
        match receive_loop(&inner, ws, &mut shutdown_rx).await {
            SessionEnd::Shutdown => break,
            SessionEnd::Lost(reason) => {
                warn!(reason = %reason, "Order book feed disconnected");
                inner.set_state(ConnectionState::Reconnecting);

                match reconnect(config, &mut backoff, &mut shutdown_rx).await {
                    Some(next) => {
                        info!(attempts = backoff.attempts(), "Order book feed reconnected");
                        backoff.reset();
                        inner.stats.lock().reconnected();
                        inner.set_state(ConnectionState::Connected);
                        ws = next;
                    }
                    None => break,
                }
            }
        }
    }

    info!("Session stopped");
}

/// Sleeps out the backoff and retries until a connection opens or shutdown.
async fn reconnect(
    config: &StreamConfig,
    backoff: &mut Backoff,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<WsStream> {
    loop {
        let delay = backoff.next_delay();
        info!(delay = ?delay, attempt = backoff.attempts(), "Waiting before reconnect");

        tokio::select! {
            _ = sleep(delay) => {}
            () = shutdown_requested(shutdown_rx) => return None,
        }

        tokio::select! {
            result = open_stream(config) => match result {
                Ok(ws) => return Some(ws),
                Err(e) => error!(error = %e, attempt = backoff.attempts(), "Reconnection failed"),
            },
            () = shutdown_requested(shutdown_rx) => return None,
        }
    }
}

/// Processes messages on one connection until it fails or shutdown.
async fn receive_loop(
    inner: &Inner,
    ws: WsStream,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut write, mut read) = ws.split();

    let mut ping_interval = tokio::time::interval(inner.config.ping_interval);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let idle_limit = inner.config.ping_interval * 2;
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            () = shutdown_requested(shutdown_rx) => {
                info!("Shutdown signal received, closing WebSocket");
                let _ = write.close().await;
                return SessionEnd::Shutdown;
            }

            _ = ping_interval.tick() => {
                let idle = last_inbound.elapsed();
                if idle > idle_limit {
                    return SessionEnd::Lost(format!("read idle for {idle:?}"));
                }
                trace!("Sending ping");
                if let Err(e) = write.send(Message::Ping(vec![])).await {
                    return SessionEnd::Lost(format!("ping failed: {e}"));
                }
            }

            msg = read.next() => {
                last_inbound = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => inner.handle_frame(&text),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => inner.handle_frame(&text),
                        Err(e) => {
                            let mut stats = inner.stats.lock();
                            stats.frame_received();
                            stats.validation_failed();
                            warn!(error = %e, "Dropping non-UTF-8 binary message");
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        trace!("Received ping, sending pong");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            return SessionEnd::Lost(format!("pong failed: {e}"));
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        trace!("Received pong");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(frame = ?frame, "Received close frame");
                        return SessionEnd::Lost("server closed connection".to_string());
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        return SessionEnd::Lost(e.to_string());
                    }
                    None => {
                        return SessionEnd::Lost("stream ended".to_string());
                    }
                }
            }
        }
    }
}
