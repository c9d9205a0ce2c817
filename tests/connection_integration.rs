//! End-to-end exercise of [`Connection`] against a real (local) WebSocket
//! server, covering simple command sends and event-handler dispatch.

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_tungstenite::tungstenite::Message as WsMessage;
use serde_json::{json, Value};

use cdp_session::connection::Connection;
use cdp_session_protocol::{CdpEvent, EventKind};

/// Spawns a blocking WS server on a free local port that accepts one
/// connection, then hands every inbound text frame to `on_message`,
/// writing back whatever JSON values it returns.
fn spawn_server(
    on_message: impl Fn(Value) -> Vec<Value> + Send + 'static,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut ws = async_tungstenite::tungstenite::accept(stream).expect("handshake");
        loop {
            match ws.read() {
                Ok(msg) if msg.is_text() => {
                    let value: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
                    for reply in on_message(value) {
                        ws.send(WsMessage::text(reply.to_string())).ok();
                    }
                }
                Ok(msg) if msg.is_close() => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    });

    format!("ws://{addr}")
}

#[async_std::test]
async fn simple_send_returns_the_matching_result() {
    let url = spawn_server(|req| {
        let id = req["id"].clone();
        vec![json!({"id": id, "result": {"result": {"value": 2, "type": "number"}}})]
    });

    let conn = Connection::connect(url).await.expect("connect");
    let result = conn
        .send(cdp_session_protocol::runtime::EvaluateParams::new("1+1"))
        .await
        .expect("send");

    assert_eq!(result.result.value, Some(json!(2)));
}

#[async_std::test]
async fn event_handler_is_invoked_exactly_once() {
    // `Connection::send` first reconciles enabled domains (it sends a
    // `Runtime.enable` oneshot before the caller's own command, since a
    // handler for a `Runtime` event is already registered), so the server
    // sees two requests; only the second should trigger the event.
    let seen = AtomicUsize::new(0);
    let url = spawn_server(move |req| {
        let id = req["id"].clone();
        let n = seen.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            vec![json!({"id": id, "result": {}})]
        } else {
            vec![
                json!({"method": "Runtime.consoleAPICalled", "params": {"type": "log", "args": [{"type": "string", "value": "hi"}], "executionContextId": 1, "timestamp": 0.0}}),
                json!({"id": id, "result": {"result": {"type": "undefined"}}}),
            ]
        }
    });

    let conn = Connection::connect(url).await.expect("connect");
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = calls.clone();
        conn.add_handler_sync(EventKind::RuntimeConsoleApiCalled, move |event| {
            let CdpEvent::RuntimeConsoleApiCalled(ev) = event else {
                return;
            };
            assert_eq!(ev.kind, "log");
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    conn.send(cdp_session_protocol::runtime::EvaluateParams::new("void 0"))
        .await
        .expect("send");

    // The event races the response on the same socket; give the listener
    // a moment to have dispatched it.
    for _ in 0..20 {
        if calls.load(Ordering::SeqCst) == 1 {
            break;
        }
        async_std::task::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
