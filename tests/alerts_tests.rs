// Alert dispatcher: webhook delivery, failure tolerance and shutdown on sender drop

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use hostguard::alerts::{AlertDispatcherConfig, spawn_dispatcher};
use hostguard::models::{AlertEvent, RankedProcess, Ranking};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

type Received = Arc<Mutex<Vec<serde_json::Value>>>;

/// Local webhook receiver: `/ok` stores the body, `/fail` stores it and answers 500.
async fn receiver() -> (String, Received) {
    let received: Received = Arc::default();
    let ok = received.clone();
    let fail = received.clone();
    let app = Router::new()
        .route(
            "/ok",
            post(move |Json(body): Json<serde_json::Value>| async move {
                ok.lock().unwrap().push(body);
                StatusCode::NO_CONTENT
            }),
        )
        .route(
            "/fail",
            post(move |Json(body): Json<serde_json::Value>| async move {
                fail.lock().unwrap().push(body);
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), received)
}

fn event(total_cpu_pct: f64) -> AlertEvent {
    AlertEvent {
        timestamp: 1_700_000_000_000,
        total_cpu_pct,
        total_mem_pct: 41.0,
        top: Ranking {
            entries: vec![
                RankedProcess {
                    pid: 812,
                    name: "stress".into(),
                    cpu_pct: 48.2,
                },
                RankedProcess {
                    pid: 90,
                    name: "rustc".into(),
                    cpu_pct: 30.0,
                },
            ],
        },
    }
}

fn dispatcher_config(webhook_url: Option<String>) -> AlertDispatcherConfig {
    AlertDispatcherConfig {
        webhook_url,
        webhook_timeout: Duration::from_secs(5),
        footer: "Test Guardian".into(),
    }
}

#[tokio::test]
async fn test_alerts_are_posted_as_embeds() {
    let (base, received) = receiver().await;
    let sent = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::channel(8);
    let handle = spawn_dispatcher(rx, dispatcher_config(Some(format!("{base}/ok"))), sent.clone())
        .expect("dispatcher");

    tx.send(event(95.5)).await.unwrap();
    tx.send(event(97.0)).await.unwrap();
    drop(tx);
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("dispatcher exits once the senders are gone")
        .unwrap();

    assert_eq!(sent.load(Ordering::Relaxed), 2);
    let bodies = received.lock().unwrap().clone();
    assert_eq!(bodies.len(), 2);
    let embed = &bodies[0]["embeds"][0];
    assert_eq!(embed["title"], "Host CPU Alert");
    assert_eq!(embed["color"], 0xE67E22);
    let description = embed["description"].as_str().unwrap();
    assert!(description.contains("`95.5%`"), "{description}");
    assert!(description.contains("**stress**"), "{description}");
    assert!(description.contains("PID `812`"), "{description}");
    let footer = embed["footer"]["text"].as_str().unwrap();
    assert!(footer.starts_with("Test Guardian • 2023-11-14T"), "{footer}");
}

#[tokio::test]
async fn test_failed_delivery_is_dropped_and_draining_continues() {
    let (base, received) = receiver().await;
    let sent = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::channel(8);
    let handle = spawn_dispatcher(rx, dispatcher_config(Some(format!("{base}/fail"))), sent.clone())
        .expect("dispatcher");

    for total in [91.0, 92.0, 93.0] {
        tx.send(event(total)).await.unwrap();
    }
    drop(tx);
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("dispatcher exits once the senders are gone")
        .unwrap();

    assert_eq!(received.lock().unwrap().len(), 3, "every alert was attempted");
    assert_eq!(sent.load(Ordering::Relaxed), 0, "failed deliveries are not counted");
}

#[tokio::test]
async fn test_unreachable_webhook_does_not_stop_the_dispatcher() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sent = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::channel(8);
    let handle = spawn_dispatcher(rx, dispatcher_config(Some(format!("http://{addr}/hook"))), sent.clone())
        .expect("dispatcher");
    tx.send(event(99.0)).await.unwrap();
    tx.send(event(99.5)).await.unwrap();
    drop(tx);
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("dispatcher exits once the senders are gone")
        .unwrap();
    assert_eq!(sent.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_without_webhook_alerts_are_only_logged_and_counted() {
    let sent = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::channel(8);
    let handle = spawn_dispatcher(rx, dispatcher_config(None), sent.clone()).expect("dispatcher");

    tx.send(event(95.0)).await.unwrap();
    drop(tx);
    handle.await.unwrap();
    assert_eq!(sent.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_dispatcher_with_no_alerts_exits_on_sender_drop() {
    let sent = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::channel::<AlertEvent>(1);
    let handle = spawn_dispatcher(rx, dispatcher_config(None), sent.clone()).expect("dispatcher");
    drop(tx);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("clean exit")
        .unwrap();
    assert_eq!(sent.load(Ordering::Relaxed), 0);
}
