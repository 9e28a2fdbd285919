//! Ordering and bounding tests against a programmable TCP backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use rest_connector::http::Request;
use rest_connector::ConnectorRegistry;

mod common;

#[tokio::test]
async fn test_responses_arrive_in_send_order() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();
    let addr = common::start_programmable_backend(move |_| {
        let c = c.clone();
        async move {
            let n = c.fetch_add(1, Ordering::SeqCst);
            // Earlier requests answer slower; order must still hold.
            tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(n as u64 * 5))).await;
            (200, n.to_string())
        }
    })
    .await;

    let registry =
        ConnectorRegistry::from_config(common::config_for("svc", &format!("http://{}", addr))).unwrap();
    let connector = registry.get_connector("svc", "/items").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    for i in 0..6 {
        let tx = tx.clone();
        connector
            .send(
                Request::new()
                    .with_parameter("seq", i)
                    .on_response(move |request, response| {
                        tx.send((i, request.parameters().len(), response)).unwrap();
                    }),
            )
            .unwrap();
    }

    for expected in 0..6 {
        let (i, params, response) = rx.recv().await.unwrap();
        assert_eq!(i, expected);
        assert_eq!(params, 1);
        assert!(response.success, "error: {}", response.error);
        assert_eq!(response.text(), expected.to_string());
    }

    connector.wait_idle().await;
    assert_eq!(connector.active_count(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_transfers_bounded_across_connectors() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (f, p) = (in_flight.clone(), peak.clone());
    let addr = common::start_programmable_backend(move |_| {
        let (f, p) = (f.clone(), p.clone());
        async move {
            let now = f.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            f.fetch_sub(1, Ordering::SeqCst);
            (200, "ok".to_string())
        }
    })
    .await;

    let mut config = common::config_for("svc", &format!("http://{}", addr));
    config.connection.max_concurrent = 2;
    let registry = ConnectorRegistry::from_config(config).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    for function in ["/a", "/b", "/c", "/d"] {
        let connector = registry.get_connector("svc", function).unwrap();
        for _ in 0..2 {
            let tx = tx.clone();
            connector
                .send(Request::new().on_response(move |_, response| {
                    tx.send(response.success).unwrap();
                }))
                .unwrap();
        }
    }
    drop(tx);

    let mut completed = 0;
    while let Some(success) = rx.recv().await {
        assert!(success);
        completed += 1;
    }
    assert_eq!(completed, 8);
    assert!(peak.load(Ordering::SeqCst) <= 2, "peak {}", peak.load(Ordering::SeqCst));

    registry.wait_idle().await;
}
