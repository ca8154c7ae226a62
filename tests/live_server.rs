//! End-to-end tests against a local tokio-tungstenite server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use frame_stream_client::{
    Endpoint, FrameFlowController, SequentialSubmitter, SessionNotice, SessionStatus,
    StreamClient, SubmitOutcome,
};

// ============================================================================
// Test Server
// ============================================================================

const REPLY: &str = r#"{"type":"success","data":"turn_left"}"#;

/// Starts a server that records every inbound JSON envelope and answers each
/// with a `success` cue. The first `drop_first` connections are closed right
/// after the handshake.
async fn spawn_server(drop_first: usize) -> (u16, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let (tx, rx) = mpsc::unbounded_channel();
    let accepted = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            let index = accepted.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                if index < drop_first {
                    let _ = ws.close(None).await;
                    return;
                }
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        let value: Value = serde_json::from_str(text.as_str()).expect("json");
                        let _ = tx.send(value);
                        if ws.send(Message::Text(String::from(REPLY).into())).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });

    (port, rx)
}

fn client_for(port: u16) -> StreamClient {
    let endpoint = Endpoint::with_port_path("127.0.0.1", port, "/ws").expect("endpoint");
    StreamClient::builder()
        .endpoint(endpoint)
        .reconnect_delay(Duration::from_millis(50))
        .build()
        .expect("build")
}

async fn wait_for(cond: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached in time");
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn frame_envelope_round_trip() {
    let (port, mut received) = spawn_server(0).await;
    let client = client_for(port);
    wait_for(|| client.is_connected()).await;

    let flow = FrameFlowController::new(Arc::new(client.clone()));

    let before = now_ms();
    assert_eq!(flow.submit_frame("abc123"), SubmitOutcome::Sent);
    let after = now_ms();
    assert_eq!(flow.submit_frame("abc123"), SubmitOutcome::Dropped);

    let envelope = timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("envelope in time")
        .expect("server running");

    assert_eq!(envelope["type"], "frame");
    assert_eq!(envelope["data"], "data:image/jpeg;base64,abc123");
    let timestamp = envelope["timestamp"].as_u64().expect("timestamp");
    assert!((before..=after).contains(&timestamp));

    wait_for(|| !flow.is_in_flight()).await;
    assert_eq!(flow.submit_frame("def456"), SubmitOutcome::Sent);
    assert_eq!(flow.stats().dropped, 1);
}

#[tokio::test]
async fn sequential_batch_is_acknowledged_in_order() {
    let (port, mut received) = spawn_server(0).await;
    let client = client_for(port);
    wait_for(|| client.is_connected()).await;

    let submitter = SequentialSubmitter::new(Arc::new(client.clone()))
        .with_ack_timeout(Some(Duration::from_secs(5)));

    let frames: Vec<String> = (0..4).map(|i| format!("frame{i}")).collect();
    let report = submitter
        .submit_all(frames.clone(), |_| {})
        .await
        .expect("batch");

    assert!(report.is_complete());
    assert_eq!(report.responses, 4);
    assert!(report.latency.is_some());

    for expected in &frames {
        let envelope = received.recv().await.expect("envelope");
        assert_eq!(
            envelope["data"],
            format!("data:image/jpeg;base64,{expected}")
        );
    }
}

#[tokio::test]
async fn reconnects_after_server_close() {
    let (port, _received) = spawn_server(1).await;
    let client = client_for(port);

    let statuses: Arc<Mutex<Vec<SessionStatus>>> = Arc::default();
    let sink = Arc::clone(&statuses);
    let _sub = client.subscribe(move |notice| {
        if let SessionNotice::Status(status) = notice {
            sink.lock().push(*status);
        }
    });

    wait_for(|| {
        statuses
            .lock()
            .contains(&SessionStatus::Reconnecting { attempt: 1, max: 3 })
    })
    .await;
    wait_for(|| client.is_connected()).await;
    assert_eq!(client.reconnect_attempts(), 0);
    assert_eq!(client.error(), None);
}

#[tokio::test]
async fn disconnect_stops_reconnecting() {
    let (port, _received) = spawn_server(0).await;
    let client = client_for(port);
    wait_for(|| client.is_connected()).await;

    client.disconnect();
    assert_eq!(client.status(), SessionStatus::Disconnected);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(client.status(), SessionStatus::Disconnected);

    client.retry();
    wait_for(|| client.is_connected()).await;
}
