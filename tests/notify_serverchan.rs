// tests/notify_serverchan.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::post, Form, Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use paper_digest::config::NotifyConfig;
use paper_digest::notify::render::BODY_LIMIT_BYTES;
use paper_digest::{DigestError, Message, Notifier};
use paper_digest::notify::ServerChanNotifier;

#[derive(Clone, Default)]
struct Stub {
    received: Arc<Mutex<Vec<HashMap<String, String>>>>,
    /// Replies handed out in order; the last one repeats.
    replies: Arc<Mutex<Vec<Value>>>,
}

async fn send_handler(
    State(stub): State<Stub>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    stub.received.lock().push(form);
    let mut replies = stub.replies.lock();
    let reply = if replies.len() > 1 {
        replies.remove(0)
    } else {
        replies[0].clone()
    };
    Json(reply)
}

/// Serve the stub on an ephemeral port; returns the endpoint base URL.
async fn spawn_stub(stub: Stub) -> String {
    let app = Router::new()
        .route("/{key}", post(send_handler))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn notifier(endpoint: String, retries: u8) -> ServerChanNotifier {
    let cfg = NotifyConfig {
        endpoint,
        retries,
        retry_delay_secs: 0,
        timeout_secs: 5,
        accept_invalid_certs: false,
    };
    ServerChanNotifier::new("SCTtest", &cfg)
        .unwrap()
        .with_retry_delay(Duration::ZERO)
}

fn msg(title: &str, body: &str) -> Message {
    Message {
        title: title.into(),
        body: body.into(),
    }
}

#[tokio::test]
async fn accepted_push_returns_push_id() {
    let stub = Stub::default();
    stub.replies
        .lock()
        .push(json!({"code": 0, "message": "", "data": {"pushid": "4242", "readkey": "r"}}));
    let base = spawn_stub(stub.clone()).await;

    let receipt = notifier(base, 3)
        .send(&msg("hello", "**body**"))
        .await
        .expect("push ok");

    assert_eq!(receipt.push_id.as_deref(), Some("4242"));
    assert_eq!(receipt.attempts, 1);
    let got = stub.received.lock();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0]["title"], "hello");
    assert_eq!(got[0]["desp"], "**body**");
}

#[tokio::test]
async fn rejected_push_retries_then_gives_up() {
    let stub = Stub::default();
    stub.replies
        .lock()
        .push(json!({"code": 40001, "message": "bad sendkey"}));
    let base = spawn_stub(stub.clone()).await;

    let err = notifier(base, 3)
        .send(&msg("t", "b"))
        .await
        .expect_err("must fail");

    assert_eq!(stub.received.lock().len(), 3);
    match err.downcast_ref::<DigestError>() {
        Some(DigestError::NotifyExhausted { attempts, last }) => {
            assert_eq!(*attempts, 3);
            assert!(last.contains("bad sendkey"), "last error: {last}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn recovers_on_second_attempt() {
    let stub = Stub::default();
    stub.replies.lock().extend([
        json!({"code": 20001, "message": "busy"}),
        json!({"code": 0, "data": {"pushid": 77}}),
    ]);
    let base = spawn_stub(stub.clone()).await;

    let receipt = notifier(base, 3).send(&msg("t", "b")).await.expect("ok");
    assert_eq!(receipt.attempts, 2);
    assert_eq!(receipt.push_id.as_deref(), Some("77"));
}

#[tokio::test]
async fn oversized_message_is_fitted_before_posting() {
    let stub = Stub::default();
    stub.replies.lock().push(json!({"code": 0, "data": {}}));
    let base = spawn_stub(stub.clone()).await;

    let long_title = "T".repeat(150);
    let long_body = "界".repeat(40_000); // 120 000 bytes
    notifier(base, 1)
        .send(&msg(&long_title, &long_body))
        .await
        .expect("ok");

    let got = stub.received.lock();
    let title = &got[0]["title"];
    let body = &got[0]["desp"];
    assert_eq!(title.chars().count(), 100);
    assert!(title.ends_with("..."));
    assert!(body.len() <= BODY_LIMIT_BYTES, "body is {} bytes", body.len());
    assert!(body.ends_with("(content too long, truncated)"));
}

#[tokio::test]
async fn transport_errors_do_not_reveal_sendkey() {
    // Grab a free port and release it so the connection is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let cfg = NotifyConfig {
        endpoint: format!("http://{addr}"),
        retries: 2,
        retry_delay_secs: 0,
        timeout_secs: 5,
        accept_invalid_certs: false,
    };
    let n = ServerChanNotifier::new("SCTsecretKEY123", &cfg)
        .unwrap()
        .with_retry_delay(Duration::ZERO);

    let err = n.send(&msg("t", "b")).await.expect_err("nothing listens");
    let shown = format!("{err:#} {err:?}");
    assert!(!shown.contains("SCTsecretKEY123"), "sendkey leaked: {shown}");
    assert!(matches!(
        err.downcast_ref::<DigestError>(),
        Some(DigestError::NotifyExhausted { attempts: 2, .. })
    ));
}
