//! End-to-end tests of the streaming client against a local mock feed.

use algo_cost_core::{Snapshot, SnapshotSubscriber};
use algo_cost_feed::{ConnectionState, FeedError, StreamConfig, StreamingClient};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// What the mock server does on one accepted connection.
#[derive(Clone)]
struct Session {
    frames: Vec<String>,
    close_after: bool,
}

impl Session {
    fn hold(frames: Vec<String>) -> Self {
        Self {
            frames,
            close_after: false,
        }
    }

    fn drop_after(frames: Vec<String>) -> Self {
        Self {
            frames,
            close_after: true,
        }
    }
}

/// Mock feed that plays one scripted session per accepted connection.
///
/// Connections beyond the script stay open without sending anything.
struct MockFeedServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockFeedServer {
    async fn start(sessions: Vec<Session>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => return,
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { return };
                        let index = counter.fetch_add(1, Ordering::SeqCst);
                        let session = sessions
                            .get(index)
                            .cloned()
                            .unwrap_or_else(|| Session::hold(vec![]));
                        tokio::spawn(serve(stream, session));
                    }
                }
            }
        });

        Self {
            addr,
            accepted,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    fn connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for MockFeedServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn serve(stream: tokio::net::TcpStream, session: Session) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws.split();

    for frame in session.frames {
        if write.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    if session.close_after {
        let _ = write.send(Message::Close(None)).await;
        return;
    }

    // Keep reading so pings are answered until the client goes away.
    while let Some(Ok(_)) = read.next().await {}
}

fn frame(second: u32) -> String {
    serde_json::json!({
        "timestamp": format!("2025-05-04T10:39:{second:02}Z"),
        "exchange": "okx",
        "symbol": "BTC-USDT-SWAP",
        "asks": [["100.5", "2"], ["101", "3"]],
        "bids": [["100", "2"], ["99.5", "3"]]
    })
    .to_string()
}

fn test_config(url: String) -> StreamConfig {
    StreamConfig::with_url(url)
        .reconnect_delays(Duration::from_millis(20), Duration::from_millis(200))
        .subscriber_limits(16, Duration::from_millis(100))
}

/// Forwards the second of every snapshot timestamp.
struct Recorder {
    name: String,
    tx: mpsc::UnboundedSender<u32>,
}

impl Recorder {
    fn new(name: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<u32>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                name: name.to_string(),
                tx,
            }),
            rx,
        )
    }
}

#[async_trait]
impl SnapshotSubscriber for Recorder {
    async fn on_snapshot(&self, snapshot: Arc<Snapshot>) -> Result<()> {
        use chrono::Timelike;
        let _ = self.tx.send(snapshot.timestamp.second());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct Sleeper;

#[async_trait]
impl SnapshotSubscriber for Sleeper {
    async fn on_snapshot(&self, _snapshot: Arc<Snapshot>) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "sleeper"
    }
}

struct Failing;

#[async_trait]
impl SnapshotSubscriber for Failing {
    async fn on_snapshot(&self, _snapshot: Arc<Snapshot>) -> Result<()> {
        anyhow::bail!("downstream unavailable")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, target: ConnectionState) {
    timeout(WAIT, rx.wait_for(|state| *state == target))
        .await
        .expect("state not reached in time")
        .unwrap();
}

async fn next(rx: &mut mpsc::UnboundedReceiver<u32>) -> u32 {
    timeout(WAIT, rx.recv())
        .await
        .expect("no snapshot in time")
        .unwrap()
}

#[tokio::test]
async fn test_malformed_frame_is_dropped_and_stream_continues() {
    let server = MockFeedServer::start(vec![Session::hold(vec![
        "{ not json".to_string(),
        r#"{"exchange": "okx"}"#.to_string(),
        frame(1),
    ])])
    .await;

    let client = StreamingClient::new(test_config(server.url()));
    let (recorder, mut rx) = Recorder::new("recorder");
    client.register(recorder).unwrap();
    client.connect().await.unwrap();

    assert_eq!(next(&mut rx).await, 1);
    assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());

    let stats = client.stats();
    assert_eq!(stats.frames_received, 3);
    assert_eq!(stats.validation_failures, 2);
    assert_eq!(stats.snapshots_dispatched, 1);

    client.close().await;
}

#[tokio::test]
async fn test_reconnects_after_server_drops_connection() {
    let server = MockFeedServer::start(vec![
        Session::drop_after(vec![frame(1)]),
        Session::hold(vec![frame(2)]),
    ])
    .await;

    let client = StreamingClient::new(test_config(server.url()));
    let (recorder, mut rx) = Recorder::new("recorder");
    client.register(recorder).unwrap();
    client.connect().await.unwrap();

    assert_eq!(next(&mut rx).await, 1);
    assert_eq!(next(&mut rx).await, 2);

    let mut states = client.state_changes();
    wait_for_state(&mut states, ConnectionState::Connected).await;
    assert_eq!(server.connections(), 2);
    assert_eq!(client.stats().reconnections, 1);

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_first_connect_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = StreamingClient::new(test_config(format!("ws://{addr}")));
    let err = client.connect().await.unwrap_err();

    assert!(matches!(err, FeedError::Connect(_)));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_close_interrupts_backoff() {
    let server = MockFeedServer::start(vec![Session::drop_after(vec![])]).await;

    let config = StreamConfig::with_url(server.url())
        .reconnect_delays(Duration::from_secs(60), Duration::from_secs(60));
    let client = StreamingClient::new(config);
    let mut states = client.state_changes();
    client.connect().await.unwrap();

    wait_for_state(&mut states, ConnectionState::Reconnecting).await;

    timeout(Duration::from_secs(1), client.close())
        .await
        .expect("close blocked on backoff");
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_slow_subscriber_does_not_stall_others() {
    let frames: Vec<String> = (1..=5).map(frame).collect();
    let server = MockFeedServer::start(vec![Session::hold(frames)]).await;

    let config = test_config(server.url()).subscriber_limits(16, Duration::from_millis(50));
    let client = StreamingClient::new(config);
    client.register(Arc::new(Sleeper)).unwrap();
    let (recorder, mut rx) = Recorder::new("recorder");
    client.register(recorder).unwrap();
    client.connect().await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(next(&mut rx).await);
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);

    client.close().await;
}

#[tokio::test]
async fn test_failing_subscriber_is_isolated() {
    let server = MockFeedServer::start(vec![Session::hold(vec![frame(1), frame(2)])]).await;

    let client = StreamingClient::new(test_config(server.url()));
    client.register(Arc::new(Failing)).unwrap();
    let (recorder, mut rx) = Recorder::new("recorder");
    client.register(recorder).unwrap();
    client.connect().await.unwrap();

    assert_eq!(next(&mut rx).await, 1);
    assert_eq!(next(&mut rx).await, 2);
    assert_eq!(client.state(), ConnectionState::Connected);

    client.close().await;
}

#[tokio::test]
async fn test_every_subscriber_receives_every_snapshot() {
    let server = MockFeedServer::start(vec![Session::hold(vec![frame(1), frame(2)])]).await;

    let client = StreamingClient::new(test_config(server.url()));
    let (first, mut first_rx) = Recorder::new("first");
    let (second, mut second_rx) = Recorder::new("second");
    client.register(first).unwrap();
    client.register(second).unwrap();
    assert_eq!(client.subscriber_count(), 2);
    client.connect().await.unwrap();

    for rx in [&mut first_rx, &mut second_rx] {
        assert_eq!(next(rx).await, 1);
        assert_eq!(next(rx).await, 2);
    }

    client.close().await;
}

#[tokio::test]
async fn test_lifecycle_after_close() {
    let server = MockFeedServer::start(vec![Session::hold(vec![])]).await;

    let client = StreamingClient::new(test_config(server.url()));
    client.connect().await.unwrap();
    assert!(matches!(
        client.connect().await,
        Err(FeedError::AlreadyConnected)
    ));

    client.close().await;
    client.close().await;

    assert!(matches!(client.connect().await, Err(FeedError::Closed)));
    let (recorder, _rx) = Recorder::new("late");
    assert!(client.register(recorder).is_none());
    assert_eq!(client.subscriber_count(), 0);
}

/// Counts completed calls, each taking 50ms.
struct SlowCounter {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SnapshotSubscriber for SlowCounter {
    async fn on_snapshot(&self, _snapshot: Arc<Snapshot>) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "slow-counter"
    }
}

#[tokio::test]
async fn test_close_stops_queued_deliveries() {
    let frames: Vec<String> = (1..=10).map(frame).collect();
    let server = MockFeedServer::start(vec![Session::hold(frames)]).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let client = StreamingClient::new(test_config(server.url()));
    client
        .register(Arc::new(SlowCounter {
            calls: Arc::clone(&calls),
        }))
        .unwrap();
    client.connect().await.unwrap();

    timeout(WAIT, async {
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first delivery not made");

    client.close().await;
    let at_close = calls.load(Ordering::SeqCst);
    assert!(at_close < 10);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(calls.load(Ordering::SeqCst), at_close);
}

#[tokio::test]
async fn test_silent_peer_triggers_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Completes the handshake, then never reads or writes.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                held.push(ws);
            }
        }
    });

    let mut config = test_config(format!("ws://{addr}"));
    config.ping_interval = Duration::from_millis(50);
    let client = StreamingClient::new(config);
    let mut states = client.state_changes();
    client.connect().await.unwrap();

    wait_for_state(&mut states, ConnectionState::Reconnecting).await;

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_responsive_peer_stays_connected() {
    let server = MockFeedServer::start(vec![Session::hold(vec![])]).await;

    let mut config = test_config(server.url());
    config.ping_interval = Duration::from_millis(50);
    let client = StreamingClient::new(config);
    client.connect().await.unwrap();

    // Ten ping periods, each answered with a pong.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.stats().reconnections, 0);
    assert_eq!(server.connections(), 1);

    client.close().await;
}

#[tokio::test]
async fn test_concurrent_close_waits_for_teardown() {
    let server = MockFeedServer::start(vec![Session::hold(vec![frame(1), frame(2)])]).await;

    let client = StreamingClient::new(test_config(server.url()));
    client.register(Arc::new(Sleeper)).unwrap();
    client.connect().await.unwrap();

    let (a, b) = (client.clone(), client.clone());
    let (first, second) = timeout(
        WAIT,
        async {
            tokio::join!(
                async move {
                    a.close().await;
                    a.state()
                },
                async move {
                    b.close().await;
                    b.state()
                }
            )
        },
    )
    .await
    .expect("close did not finish");

    assert_eq!(first, ConnectionState::Closed);
    assert_eq!(second, ConnectionState::Closed);
    assert_eq!(client.subscriber_count(), 0);
}
