//! Azure Voice Live WebSocket client.
//!
//! Owns the upstream connection for one bridge session. [`connect`] performs
//! the handshake and spawns an IO task; the caller gets a cloneable
//! [`VoiceLiveHandle`] for outbound events and an mpsc receiver for inbound
//! ones. Dropping every handle makes the IO task send a close frame and shut
//! the connection down.
//!
//! # API Reference
//!
//! - Endpoint: `wss://<resource>.cognitiveservices.azure.com/?api-version=<v>&model=<model>`
//! - Auth: `api-key` request header
//! - Protocol: WebSocket with JSON events
//! - Audio: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::config::VoiceLiveConfig;
use super::messages::{ClientEvent, ServerEvent, SessionConfig};
use crate::errors::{SessionError, SessionResult};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the inbound server event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Time allowed for the TCP + TLS + WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Upper bound on a single WebSocket message: a few seconds of base64 PCM16
/// fits comfortably under this.
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

type VoiceLiveStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Handle
// =============================================================================

/// Sending half of a Voice Live connection.
///
/// Cheap to clone; every clone feeds the same connection. All senders
/// dropping is the disconnect signal.
#[derive(Clone)]
pub struct VoiceLiveHandle {
    command_tx: mpsc::Sender<ClientEvent>,
}

impl VoiceLiveHandle {
    /// Send an event to the service.
    pub async fn send(&self, event: ClientEvent) -> SessionResult<()> {
        self.command_tx.send(event).await.map_err(|_| {
            SessionError::ConnectionLost("Voice Live send channel closed".to_string())
        })
    }

    /// Send the one-time session configuration.
    pub async fn configure(&self, config: &VoiceLiveConfig) -> SessionResult<()> {
        self.send(ClientEvent::SessionUpdate {
            session: SessionConfig::for_bridge(config),
        })
        .await
    }

    /// Append caller audio to the remote input buffer.
    pub async fn append_audio(&self, data: &[u8]) -> SessionResult<()> {
        self.send(ClientEvent::audio_append(data)).await
    }

    /// Cancel the in-flight response.
    pub async fn cancel_response(&self) -> SessionResult<()> {
        self.send(ClientEvent::ResponseCancel).await
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Connect to the Voice Live endpoint and spawn the connection IO task.
///
/// Returns the command handle and the stream of parsed server events. The
/// event channel closing means the connection ended, whichever side closed
/// it first.
pub async fn connect(
    config: &VoiceLiveConfig,
) -> SessionResult<(VoiceLiveHandle, mpsc::Receiver<ServerEvent>)> {
    let url = config.ws_url()?;

    let host = url
        .host_str()
        .ok_or_else(|| SessionError::Configuration(format!("Endpoint URL has no host: {url}")))?;
    let host_header = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let request = http::Request::builder()
        .uri(url.as_str())
        .header("api-key", &config.api_key)
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", host_header)
        .body(())
        .map_err(|e| SessionError::Connect(format!("invalid connection request: {e}")))?;

    let ws_config = WebSocketConfig::default()
        .max_message_size(Some(MAX_WS_MESSAGE_SIZE))
        .max_frame_size(Some(MAX_WS_MESSAGE_SIZE));

    let connect_result = tokio::time::timeout(
        CONNECT_TIMEOUT,
        tokio_tungstenite::connect_async_with_config(request, Some(ws_config), false),
    )
    .await
    .map_err(|_| {
        SessionError::Connect(format!(
            "handshake timed out after {}s",
            CONNECT_TIMEOUT.as_secs()
        ))
    })?;

    let (ws_stream, _response) =
        connect_result.map_err(|e| SessionError::Connect(e.to_string()))?;

    tracing::info!("Connected to Voice Live endpoint");

    let (command_tx, command_rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(EVENT_CHANNEL_CAPACITY);

    tokio::spawn(run_connection(ws_stream, command_rx, event_tx));

    Ok((VoiceLiveHandle { command_tx }, event_rx))
}

/// Connection IO task: pumps outbound commands onto the socket and parsed
/// server events off it. Ends when either side closes or every command
/// sender is dropped.
async fn run_connection(
    ws_stream: VoiceLiveStream,
    mut command_rx: mpsc::Receiver<ClientEvent>,
    event_tx: mpsc::Sender<ServerEvent>,
) {
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                match command {
                    Some(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }
                    None => {
                        // Session torn down on our side
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            message = ws_stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => {
                                if event_tx.send(event).await.is_err() {
                                    // Session side is gone
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse server event: {} - {}", e, text);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by Voice Live endpoint");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            tracing::error!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::debug!("Voice Live connection task ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::voicelive::config::{DEFAULT_INSTRUCTIONS, DEFAULT_MODEL, DEFAULT_VOICE};
    use tokio::net::TcpListener;

    fn loopback_config(addr: std::net::SocketAddr) -> VoiceLiveConfig {
        VoiceLiveConfig {
            endpoint: format!("ws://{addr}"),
            api_key: "test-key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop so the port has no listener
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = connect(&loopback_config(addr)).await;
        assert!(matches!(result, Err(SessionError::Connect(_))));
    }

    #[tokio::test]
    async fn test_connect_configure_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let msg = ws.next().await.unwrap().unwrap();
            let value: serde_json::Value =
                serde_json::from_str(msg.to_text().unwrap()).unwrap();
            assert_eq!(value["type"], "session.update");
            assert_eq!(value["session"]["input_audio_format"], "pcm16");

            let ack =
                serde_json::json!({"type": "session.updated", "session": {"id": "sess_test"}});
            ws.send(Message::Text(ack.to_string().into())).await.unwrap();

            // Client side closes once every handle is dropped
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });

        let config = loopback_config(addr);
        let (handle, mut events) = connect(&config).await.unwrap();
        handle.configure(&config).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            ServerEvent::SessionUpdated { session } => assert_eq!(session.id, "sess_test"),
            other => panic!("unexpected event: {other:?}"),
        }

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }
}
