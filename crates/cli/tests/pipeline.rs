//! Feed to estimate, end to end, against a local WebSocket server.

use algo_cost_core::OrderParams;
use algo_cost_estimator::{CostAggregator, CostModels, FeeCalculator};
use algo_cost_feed::{StreamConfig, StreamingClient};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

async fn start_feed(frames: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut write, mut read) = ws.split();
        for frame in frames {
            tokio::time::sleep(Duration::from_millis(150)).await;
            if write.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        while let Some(Ok(_)) = read.next().await {}
    });

    format!("ws://{addr}")
}

fn frame(best_bid: &str) -> String {
    serde_json::json!({
        "timestamp": "2025-05-04T10:39:13Z",
        "exchange": "okx",
        "symbol": "BTC-USDT-SWAP",
        "asks": [["100.5", "2"], ["101", "3"]],
        "bids": [[best_bid, "2"], ["99.5", "3"]]
    })
    .to_string()
}

#[tokio::test]
async fn test_stream_produces_estimates() {
    let url = start_feed(vec![frame("100"), "garbage".to_string(), frame("100.25")]).await;

    let (params_tx, params_rx) = watch::channel(OrderParams::new(500.0, 0.01, "Tier 1"));
    let aggregator = Arc::new(CostAggregator::new(
        Arc::new(CostModels::new()),
        FeeCalculator::new(),
        params_rx,
    ));
    let mut results = aggregator.results();

    let client = StreamingClient::new(StreamConfig::with_url(url));
    client.register(aggregator.clone()).unwrap();
    client.connect().await.unwrap();

    timeout(Duration::from_secs(5), results.changed())
        .await
        .expect("no estimate")
        .unwrap();
    let first = results.borrow_and_update().clone().unwrap();
    assert!((first.mid_price - 100.25).abs() < 1e-12);
    assert!((first.fees - 0.5).abs() < 1e-12);
    let expected = (first.slippage_pct + first.impact_pct) * 500.0 / 100.0 + first.fees;
    assert!((first.net_cost - expected).abs() < 1e-9);

    params_tx.send_replace(OrderParams::new(500.0, 0.01, "Tier 3"));

    let second = timeout(Duration::from_secs(5), async {
        loop {
            results.changed().await.unwrap();
            let latest = results.borrow_and_update().clone().unwrap();
            if (latest.mid_price - 100.375).abs() < 1e-12 {
                return latest;
            }
        }
    })
    .await
    .expect("second snapshot not estimated");

    assert!(second.spread_pct < first.spread_pct);
    assert!(second.slippage_pct >= 0.0);
    assert!((second.maker_pct + second.taker_pct - 100.0).abs() < 1e-6);

    client.close().await;
    assert_eq!(client.stats().validation_failures, 1);
}
