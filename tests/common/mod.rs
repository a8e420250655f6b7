//! In-process fake of the admin backend: REST routes plus a Socket.IO
//! websocket that records `join_chat` and pushes `new_message` frames.

#![allow(dead_code)]

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use dispute_console::config::ConsoleConfig;

pub const TOKEN: &str = "test-admin-token";

pub struct BackendState {
    pub dispute: Mutex<Value>,
    /// Status and body returned by resolve-dispute
    pub resolve_reply: Mutex<(StatusCode, Value)>,
    /// When set, replaces the JSON reply body with this raw text
    pub resolve_raw_body: Mutex<Option<String>>,
    pub send_reply: Mutex<(StatusCode, Value)>,
    pub sent: Mutex<Vec<Value>>,
    pub resolve_requests: Mutex<Vec<Value>>,
    pub auth_headers: Mutex<Vec<String>>,
    pub joined: Mutex<Vec<String>>,
    pub connections: AtomicUsize,
    pub disconnects: AtomicUsize,
    push_tx: broadcast::Sender<String>,
}

pub struct TestBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl TestBackend {
    pub async fn spawn(dispute: Value) -> Self {
        let (push_tx, _) = broadcast::channel(64);
        let state = Arc::new(BackendState {
            dispute: Mutex::new(dispute),
            resolve_reply: Mutex::new((StatusCode::OK, json!({ "success": true }))),
            resolve_raw_body: Mutex::new(None),
            send_reply: Mutex::new((StatusCode::OK, json!({ "success": true }))),
            sent: Mutex::new(Vec::new()),
            resolve_requests: Mutex::new(Vec::new()),
            auth_headers: Mutex::new(Vec::new()),
            joined: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            push_tx,
        });

        let app = Router::new()
            .route("/api/admin/get-dispute/{id}", get(get_dispute))
            .route("/api/admin/resolve-dispute/{id}", post(resolve_dispute))
            .route("/api/admin/send-chat", post(send_chat))
            .route("/socket.io/", get(socket_io))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test backend crashed");
        });

        Self { base_url: format!("http://{}", addr), state }
    }

    pub fn config(&self) -> ConsoleConfig {
        let mut config = ConsoleConfig::new(&self.base_url, TOKEN);
        config.request_timeout = Duration::from_secs(5);
        config
    }

    /// Push a `new_message` event to every connected socket
    pub fn push_message(&self, message: Value) {
        let frame = format!("42{}", json!(["new_message", message]));
        let _ = self.state.push_tx.send(frame);
    }

    pub fn set_resolve_reply(&self, status: StatusCode, body: Value) {
        *self.state.resolve_reply.lock() = (status, body);
    }

    pub fn set_resolve_raw_reply(&self, status: StatusCode, body: &str) {
        *self.state.resolve_reply.lock() = (status, Value::Null);
        *self.state.resolve_raw_body.lock() = Some(body.to_string());
    }

    pub fn set_send_reply(&self, status: StatusCode, body: Value) {
        *self.state.send_reply.lock() = (status, body);
    }

    pub fn joined(&self) -> Vec<String> {
        self.state.joined.lock().clone()
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn sample_dispute() -> Value {
    json!({
        "id": "d1",
        "status": "OPEN",
        "reason": "Payment not received",
        "description": "Buyer claims to have sent the payment but seller has not confirmed.",
        "evidence": "https://files.example/proof.png",
        "user": { "id": "buyer-1", "username": "john_doe" },
        "createdAt": "2025-09-25T14:30:00.000Z",
        "trade": {
            "id": "t1",
            "buyer": { "id": "buyer-1", "username": "john_doe" },
            "seller": { "id": "seller-1", "username": "jane_smith" },
            "amountFiat": 500,
            "amountCrypto": "0.01",
            "offer": { "currency": "NGN", "crypto": "BTC" },
            "chat": {
                "id": "c1",
                "messages": [
                    { "id": "m1", "chatId": "c1", "senderId": null, "content": "Dispute opened",
                      "attachment": null, "type": "SYSTEM", "createdAt": "2025-09-25T14:30:00.000Z" },
                    { "id": "m2", "chatId": "c1", "senderId": "buyer-1", "content": "I paid",
                      "attachment": null, "type": "USER", "createdAt": "2025-09-25T14:31:00.000Z" }
                ]
            }
        }
    })
}

pub fn chat_message(id: &str, sender: Option<&str>, content: &str) -> Value {
    json!({
        "id": id,
        "chatId": "c1",
        "senderId": sender,
        "content": content,
        "attachment": null,
        "type": "USER",
        "createdAt": "2025-09-25T15:00:00.000Z"
    })
}

fn record_auth(state: &BackendState, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.auth_headers.lock().push(value);
}

async fn get_dispute(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_auth(&state, &headers);
    let dispute = state.dispute.lock().clone();
    if dispute["id"] == id {
        Json(json!({ "success": true, "dispute": dispute })).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": true, "message": "Dispute not found" })),
        )
            .into_response()
    }
}

async fn resolve_dispute(
    State(state): State<Arc<BackendState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_auth(&state, &headers);
    state.resolve_requests.lock().push(body.clone());

    let (status, reply) = state.resolve_reply.lock().clone();
    if status.is_success() {
        let new_status = match body["winner"].as_str() {
            Some("BUYER") => "RESOLVED_BUYER",
            _ => "RESOLVED_SELLER",
        };
        state.dispute.lock()["status"] = json!(new_status);
    }

    let raw = state.resolve_raw_body.lock().clone();
    match raw {
        Some(raw) => (status, raw).into_response(),
        None => (status, Json(reply)).into_response(),
    }
}

async fn send_chat(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_auth(&state, &headers);
    state.sent.lock().push(body.clone());

    let (status, reply) = state.send_reply.lock().clone();
    if status.is_success() {
        // The backend echoes operator messages back over the socket
        let id = format!("admin-{}", state.sent.lock().len());
        let message = chat_message(&id, Some("admin-1"), body["content"].as_str().unwrap_or_default());
        let _ = state.push_tx.send(format!("42{}", json!(["new_message", message])));
    }
    (status, Json(reply)).into_response()
}

async fn socket_io(ws: WebSocketUpgrade, State(state): State<Arc<BackendState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<BackendState>) {
    let mut pushes = state.push_tx.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);

    let open = r#"0{"sid":"engine-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
    if socket.send(Message::Text(open.to_string().into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else { break };
                match message {
                    Message::Text(text) => {
                        let text = text.as_str();
                        if text == "40" {
                            let ack = r#"40{"sid":"socket-1"}"#.to_string();
                            if socket.send(Message::Text(ack.into())).await.is_err() {
                                break;
                            }
                        } else if let Some(payload) = text.strip_prefix("42") {
                            if let Ok(Value::Array(args)) = serde_json::from_str::<Value>(payload) {
                                if args.first().and_then(Value::as_str) == Some("join_chat") {
                                    let chat_id = args.get(1).and_then(Value::as_str).unwrap_or_default();
                                    state.joined.lock().push(chat_id.to_string());
                                }
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            pushed = pushes.recv() => {
                let Ok(frame) = pushed else { break };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.disconnects.fetch_add(1, Ordering::SeqCst);
}
