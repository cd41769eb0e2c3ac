//! Shared infrastructure for integration tests
//!
//! Provides a mock Voice Live WebSocket server that speaks the
//! OpenAI-realtime-style protocol, a helper that spawns the bridge on an
//! ephemeral port, and a thin browser-side client.

// Allow dead code in test infrastructure - not every test binary uses every helper
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_hdr_async, connect_async};

use voicelive_bridge::config::BridgeConfig;
use voicelive_bridge::routes;
use voicelive_bridge::state::AppState;

/// How long helpers wait for an expected message before failing the test
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Mock Voice Live server
// =============================================================================

/// What the mock connection should do next
pub enum MockDirective {
    /// Send a JSON event to the bridge
    Send(Value),
    /// Close the WebSocket
    Close,
}

/// One accepted Voice Live connection, as seen by a test.
pub struct MockConnection {
    /// Value of the `api-key` header captured during the handshake
    pub api_key: Option<String>,
    /// Request path and query captured during the handshake
    pub path: String,
    events: mpsc::UnboundedReceiver<Value>,
    directives: mpsc::UnboundedSender<MockDirective>,
}

impl MockConnection {
    /// Next event the bridge sent to the mock.
    pub async fn recv(&mut self) -> Value {
        timeout(RECV_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for an event from the bridge")
            .expect("Voice Live connection closed while waiting for an event")
    }

    /// Wait until the bridge drops the connection, discarding any events
    /// still in flight.
    pub async fn recv_closed(&mut self) {
        loop {
            match timeout(RECV_TIMEOUT, self.events.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return,
                Err(_) => panic!("timed out waiting for the bridge to close the connection"),
            }
        }
    }

    /// Queue a JSON event for delivery to the bridge.
    pub fn send(&self, event: Value) {
        self.directives
            .send(MockDirective::Send(event))
            .expect("mock connection task is gone");
    }

    /// Close the WebSocket from the mock side.
    pub fn close(&self) {
        let _ = self.directives.send(MockDirective::Close);
    }

    /// Consume the `session.update` the bridge sends on connect and reply
    /// with a configuration ack carrying `session_id`. Returns the update
    /// for further assertions.
    pub async fn ack_session(&mut self, session_id: &str) -> Value {
        let update = self.recv().await;
        assert_eq!(update["type"], "session.update", "expected session.update first");
        self.send(json!({
            "type": "session.updated",
            "session": {"id": session_id}
        }));
        update
    }
}

/// Mock Voice Live endpoint accepting any number of connections.
pub struct MockVoiceLive {
    addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<MockConnection>,
}

impl MockVoiceLive {
    /// Bind an ephemeral port and start accepting connections.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock listener");
        let addr = listener.local_addr().unwrap();
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let conn_tx = conn_tx.clone();
                tokio::spawn(handle_connection(stream, conn_tx));
            }
        });

        Self {
            addr,
            connections: conn_rx,
        }
    }

    /// Endpoint value for [`BridgeConfig::voicelive_endpoint`].
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait for the bridge to open its next connection.
    pub async fn next_connection(&mut self) -> MockConnection {
        timeout(RECV_TIMEOUT, self.connections.recv())
            .await
            .expect("timed out waiting for a Voice Live connection")
            .expect("mock listener task is gone")
    }
}

async fn handle_connection(stream: TcpStream, conn_tx: mpsc::UnboundedSender<MockConnection>) {
    let mut api_key = None;
    let mut path = String::new();
    let callback = |req: &Request, resp: Response| {
        api_key = req
            .headers()
            .get("api-key")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        path = req
            .uri()
            .path_and_query()
            .map(|p| p.to_string())
            .unwrap_or_default();
        Ok(resp)
    };
    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };

    let (mut write, mut read) = ws_stream.split();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (directive_tx, mut directive_rx) = mpsc::unbounded_channel();

    let connection = MockConnection {
        api_key,
        path,
        events: event_rx,
        directives: directive_tx,
    };
    if conn_tx.send(connection).is_err() {
        return;
    }

    loop {
        select! {
            directive = directive_rx.recv() => match directive {
                Some(MockDirective::Send(event)) => {
                    if write.send(Message::Text(event.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Some(MockDirective::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },

            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(event) = serde_json::from_str::<Value>(&text) {
                        let _ = event_tx.send(event);
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// =============================================================================
// Bridge server
// =============================================================================

/// Configuration pointing the bridge at `endpoint` with test credentials.
pub fn test_config(endpoint: Option<String>) -> BridgeConfig {
    BridgeConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        voicelive_endpoint: endpoint,
        voicelive_api_key: Some("test-api-key".to_string()),
        model: "gpt-4o-realtime-preview".to_string(),
        voice: "alloy".to_string(),
        instructions: "You are a test assistant.".to_string(),
        cors_allowed_origins: None,
    }
}

/// Start the bridge on an ephemeral port with the full route set.
pub async fn spawn_bridge(config: BridgeConfig) -> (SocketAddr, Arc<AppState>) {
    let app_state = AppState::new(config);
    let app = routes::api::create_api_router()
        .merge(routes::session::create_session_router())
        .with_state(app_state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind bridge listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            eprintln!("bridge server error: {e}");
        }
    });

    (addr, app_state)
}

// =============================================================================
// Browser-side client
// =============================================================================

pub type BrowserSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a browser-side WebSocket to the bridge's session endpoint.
pub async fn connect_browser(addr: SocketAddr) -> BrowserSocket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("browser failed to connect to the bridge");
    socket
}

/// Send a JSON message from the browser side.
pub async fn send_json(socket: &mut BrowserSocket, message: Value) {
    socket
        .send(Message::Text(message.to_string().into()))
        .await
        .expect("browser failed to send");
}

/// Next JSON message from the bridge, skipping pings.
pub async fn recv_json(socket: &mut BrowserSocket) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a message from the bridge")
            .expect("browser socket closed while waiting for a message")
            .expect("browser socket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("bridge sent invalid JSON");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected browser-side message: {other:?}"),
        }
    }
}

/// Wait for the bridge to close the browser socket, returning any JSON
/// messages that arrived first.
pub async fn recv_until_close(socket: &mut BrowserSocket) -> Vec<Value> {
    let mut messages = Vec::new();
    loop {
        let msg = match timeout(RECV_TIMEOUT, socket.next()).await {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(_))) | Ok(None) => return messages,
            Err(_) => panic!("timed out waiting for the bridge to close the browser socket"),
        };

        match msg {
            Message::Text(text) => {
                messages.push(serde_json::from_str(&text).expect("bridge sent invalid JSON"));
            }
            Message::Close(_) => return messages,
            _ => continue,
        }
    }
}

/// Poll until the registry holds exactly `expected` sessions.
pub async fn wait_for_session_count(state: &AppState, expected: usize) {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    loop {
        if state.sessions.len() == expected {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!(
                "registry never reached {} sessions (currently {})",
                expected,
                state.sessions.len()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
