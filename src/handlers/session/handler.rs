//! Voice session WebSocket handler.
//!
//! One invocation of this handler is one bridge session: it upgrades the
//! browser connection, opens the paired Voice Live connection, and runs the
//! two relay loops until either side ends the conversation.
//!
//! The loops are symmetric in shape and share nothing but the [`Session`]
//! record and a cancellation token. Whichever loop hits a terminal condition
//! first moves the session into Closing and cancels the other; the handler
//! then tears both links down and reports why.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use base64::prelude::*;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::session::{Session, SessionPhase, TurnState};
use crate::core::voicelive::{self, ServerEvent, VoiceLiveHandle};
use crate::errors::SessionError;
use crate::state::AppState;

use super::messages::{SessionIncomingMessage, SessionMessageRoute, SessionOutgoingMessage};

/// Optimized channel buffer size for audio workloads
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Time allowed for queued outgoing messages to flush during teardown
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a relay loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Browser sent a stop message
    ClientStop,
    /// Browser WebSocket closed or errored
    BrowserClosed,
    /// Voice Live connection ended
    RemoteClosed,
    /// Voice Live rejected the session during setup
    RemoteRejected,
    /// The other loop ended first
    Cancelled,
}

/// Voice session WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket and runs a full bridge session
/// over it. Everything the remote endpoint needs (URL, key, model, voice) is
/// server-held; the browser supplies nothing but audio and control messages.
///
/// # Arguments
/// * `ws` - The WebSocket upgrade request from Axum
/// * `state` - Application state containing configuration and the registry
///
/// # Returns
/// * `Response` - HTTP response that upgrades the connection to WebSocket
pub async fn session_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Voice session WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_session_socket(socket, state))
}

/// Handle the voice session WebSocket connection
async fn handle_session_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Voice session WebSocket connection established");

    let (mut sender, receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<SessionMessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let should_close = matches!(route, SessionMessageRoute::Close);

            let result = match route {
                SessionMessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                SessionMessageRoute::Close => {
                    info!("Closing voice session WebSocket connection");
                    sender.send(Message::Close(None)).await
                }
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    // Fail closed when the server holds no usable credentials: exactly one
    // error event, then close, and no session record is ever created.
    let voicelive_config = match app_state.config.voicelive() {
        Ok(config) => config,
        Err(e) => {
            warn!("Rejecting voice session: {e}");
            let message = match &e {
                SessionError::Configuration(msg) => msg.clone(),
                other => other.to_string(),
            };
            reject_session(&message_tx, "configuration_error", message).await;
            drop(message_tx);
            drain_sender(sender_task).await;
            return;
        }
    };

    let (remote, remote_events) = match voicelive::connect(&voicelive_config).await {
        Ok(pair) => pair,
        Err(e) => {
            error!("Voice Live connection failed: {e}");
            reject_session(&message_tx, "connection_error", e.to_string()).await;
            drop(message_tx);
            drain_sender(sender_task).await;
            return;
        }
    };

    if let Err(e) = remote.configure(&voicelive_config).await {
        error!("Failed to send session configuration: {e}");
        reject_session(&message_tx, "connection_error", e.to_string()).await;
        drop(message_tx);
        drain_sender(sender_task).await;
        return;
    }

    let session = Session::new();
    app_state.sessions.insert(session.clone());
    info!(session_id = %session.id(), "Voice session started");

    let cancel = CancellationToken::new();

    let uplink = tokio::spawn(relay_browser_to_remote(
        receiver,
        remote.clone(),
        session.clone(),
        cancel.clone(),
    ));
    let downlink = tokio::spawn(relay_remote_to_browser(
        remote_events,
        session.clone(),
        message_tx.clone(),
        cancel.clone(),
    ));

    // Each loop cancels the other before returning, so joining sequentially
    // never waits on a loop that has not been told to stop.
    let uplink_reason = match uplink.await {
        Ok(reason) => reason,
        Err(e) => {
            error!(session_id = %session.id(), "Uplink task failed: {e}");
            cancel.cancel();
            CloseReason::Cancelled
        }
    };
    let downlink_reason = match downlink.await {
        Ok(reason) => reason,
        Err(e) => {
            error!(session_id = %session.id(), "Downlink task failed: {e}");
            CloseReason::Cancelled
        }
    };

    if should_notify_connection_lost(uplink_reason, downlink_reason) {
        let _ = message_tx
            .send(SessionMessageRoute::Outgoing(SessionOutgoingMessage::Error {
                code: Some("connection_lost".to_string()),
                message: "Voice Live connection lost".to_string(),
            }))
            .await;
    }

    let _ = message_tx.send(SessionMessageRoute::Close).await;
    drop(message_tx);
    drain_sender(sender_task).await;

    // Last handle: the remote IO task sends its close frame and exits
    drop(remote);

    session.finish_close();
    app_state.sessions.remove(&session.id());
    info!(
        session_id = %session.id(),
        uplink = ?uplink_reason,
        downlink = ?downlink_reason,
        "Voice session ended"
    );
}

/// Whether the browser is still connected and deserves to hear that the
/// remote side went away. Either loop can be the one that discovers the
/// drop: the downlink when its event stream ends, the uplink when a send
/// to the dead connection fails mid-audio. No notification when the close
/// was the browser's own doing, and none for a setup rejection, which
/// already carried its own error event.
fn should_notify_connection_lost(uplink: CloseReason, downlink: CloseReason) -> bool {
    let remote_dropped =
        uplink == CloseReason::RemoteClosed || downlink == CloseReason::RemoteClosed;
    let browser_ended = matches!(
        uplink,
        CloseReason::BrowserClosed | CloseReason::ClientStop
    );
    remote_dropped && !browser_ended
}

/// Send an error and a close to a browser whose session never started.
async fn reject_session(
    message_tx: &mpsc::Sender<SessionMessageRoute>,
    code: &str,
    message: String,
) {
    let _ = message_tx
        .send(SessionMessageRoute::Outgoing(SessionOutgoingMessage::Error {
            code: Some(code.to_string()),
            message,
        }))
        .await;
    let _ = message_tx.send(SessionMessageRoute::Close).await;
}

/// Give the sender task a bounded window to flush, then abort it.
async fn drain_sender(mut sender_task: tokio::task::JoinHandle<()>) {
    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        warn!("Sender task did not drain in time, aborting");
        sender_task.abort();
    }
}

// =============================================================================
// Uplink: browser -> Voice Live
// =============================================================================

/// Relay caller audio and control messages to the remote endpoint.
async fn relay_browser_to_remote(
    mut receiver: SplitStream<WebSocket>,
    remote: VoiceLiveHandle,
    session: Session,
    cancel: CancellationToken,
) -> CloseReason {
    let reason = loop {
        select! {
            _ = cancel.cancelled() => break CloseReason::Cancelled,

            msg_result = receiver.next() => {
                match msg_result {
                    Some(Ok(msg)) => {
                        if let Some(reason) = process_browser_message(msg, &remote, &session).await {
                            break reason;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session.id(), "Browser WebSocket error: {e}");
                        break CloseReason::BrowserClosed;
                    }
                    None => {
                        info!(session_id = %session.id(), "Browser WebSocket closed");
                        break CloseReason::BrowserClosed;
                    }
                }
            }
        }
    };

    session.begin_close();
    cancel.cancel();
    reason
}

/// Process one incoming browser frame. Returns the close reason when the
/// frame ends the session.
async fn process_browser_message(
    msg: Message,
    remote: &VoiceLiveHandle,
    session: &Session,
) -> Option<CloseReason> {
    match msg {
        Message::Text(text) => {
            let incoming: SessionIncomingMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(session_id = %session.id(), "Dropping malformed browser message: {e}");
                    return None;
                }
            };

            if let Err(e) = incoming.validate_size() {
                warn!(session_id = %session.id(), "Dropping oversized browser message: {e}");
                return None;
            }

            handle_browser_message(incoming, remote, session).await
        }
        Message::Binary(_) => {
            debug!(session_id = %session.id(), "Ignoring binary frame; audio rides in JSON");
            None
        }
        Message::Ping(_) | Message::Pong(_) => None,
        Message::Close(_) => {
            info!(session_id = %session.id(), "Browser WebSocket close received");
            Some(CloseReason::BrowserClosed)
        }
    }
}

/// Handle a parsed browser message.
async fn handle_browser_message(
    msg: SessionIncomingMessage,
    remote: &VoiceLiveHandle,
    session: &Session,
) -> Option<CloseReason> {
    match msg {
        SessionIncomingMessage::Audio { audio } => {
            if !session.may_forward_audio() {
                debug!(
                    session_id = %session.id(),
                    phase = %session.phase(),
                    "Dropping caller audio"
                );
                return None;
            }

            // Reject undecodable payloads here instead of relaying them
            let pcm = match BASE64_STANDARD.decode(audio.as_bytes()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(session_id = %session.id(), "Dropping undecodable audio payload: {e}");
                    return None;
                }
            };

            if let Err(e) = remote.append_audio(&pcm).await {
                warn!(session_id = %session.id(), "Failed to forward caller audio: {e}");
                return Some(CloseReason::RemoteClosed);
            }
            None
        }

        SessionIncomingMessage::Interrupt => {
            if session.begin_interrupt(Instant::now()) {
                info!(session_id = %session.id(), "Caller interrupt, cancelling response");
                if let Err(e) = remote.cancel_response().await {
                    warn!(session_id = %session.id(), "Failed to send cancellation: {e}");
                    return Some(CloseReason::RemoteClosed);
                }
            } else {
                debug!(
                    session_id = %session.id(),
                    phase = %session.phase(),
                    "Ignoring interrupt"
                );
            }
            None
        }

        SessionIncomingMessage::Stop => {
            info!(session_id = %session.id(), "Stop requested by browser");
            Some(CloseReason::ClientStop)
        }

        SessionIncomingMessage::Unknown => {
            debug!(session_id = %session.id(), "Ignoring unknown browser message");
            None
        }
    }
}

// =============================================================================
// Downlink: Voice Live -> browser
// =============================================================================

/// Relay remote events to the browser as envelope messages.
async fn relay_remote_to_browser(
    mut events: mpsc::Receiver<ServerEvent>,
    session: Session,
    message_tx: mpsc::Sender<SessionMessageRoute>,
    cancel: CancellationToken,
) -> CloseReason {
    let reason = loop {
        select! {
            _ = cancel.cancelled() => break CloseReason::Cancelled,

            event = events.recv() => {
                match event {
                    Some(event) => {
                        if let Some(reason) = handle_remote_event(event, &session, &message_tx).await {
                            break reason;
                        }
                    }
                    None => {
                        info!(session_id = %session.id(), "Voice Live connection ended");
                        break CloseReason::RemoteClosed;
                    }
                }
            }
        }
    };

    session.begin_close();
    cancel.cancel();
    reason
}

/// Handle one remote event. Returns the close reason when the event ends
/// the session.
async fn handle_remote_event(
    event: ServerEvent,
    session: &Session,
    message_tx: &mpsc::Sender<SessionMessageRoute>,
) -> Option<CloseReason> {
    match event {
        ServerEvent::SessionCreated { session: info } => {
            debug!(
                session_id = %session.id(),
                remote_session_id = %info.id,
                "Remote session created"
            );
            None
        }

        ServerEvent::SessionUpdated { session: info } => {
            if session.activate(&info.id) {
                info!(
                    session_id = %session.id(),
                    remote_session_id = %info.id,
                    "Voice session ready"
                );
                forward(
                    message_tx,
                    SessionOutgoingMessage::SessionReady {
                        session_id: info.id,
                    },
                )
                .await
            } else {
                debug!(session_id = %session.id(), "Ignoring repeated configuration ack");
                None
            }
        }

        ServerEvent::SpeechStarted { .. } => {
            session.set_turn(TurnState::UserSpeaking);
            forward(message_tx, SessionOutgoingMessage::SpeechStarted).await
        }

        ServerEvent::SpeechStopped { .. } => {
            session.set_turn(TurnState::Idle);
            forward(message_tx, SessionOutgoingMessage::SpeechStopped).await
        }

        ServerEvent::ResponseCreated { .. } => {
            session.response_started();
            forward(message_tx, SessionOutgoingMessage::ResponseStarted).await
        }

        ServerEvent::AudioDelta { delta, .. } => {
            if session.suppress_playback(Instant::now()) {
                debug!(session_id = %session.id(), "Discarding assistant audio during interrupt");
                return None;
            }

            // Decode and re-encode so only verified PCM payloads go out
            let pcm = match ServerEvent::decode_audio_delta(&delta) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(session_id = %session.id(), "Skipping undecodable audio delta: {e}");
                    return None;
                }
            };

            session.set_turn(TurnState::AssistantSpeaking);
            forward(
                message_tx,
                SessionOutgoingMessage::Audio {
                    audio: BASE64_STANDARD.encode(&pcm),
                },
            )
            .await
        }

        ServerEvent::AudioDone { .. } => {
            forward(message_tx, SessionOutgoingMessage::ResponseAudioDone).await
        }

        ServerEvent::ResponseDone { .. } => {
            session.response_finished();
            forward(message_tx, SessionOutgoingMessage::ResponseDone).await
        }

        ServerEvent::Error { error } => {
            // During setup a remote error means the session never becomes
            // usable; afterwards it is reported and the session continues.
            if session.phase() == SessionPhase::SettingUp {
                error!(
                    session_id = %session.id(),
                    "Voice Live rejected session: {}",
                    error.message
                );
                let _ = forward(
                    message_tx,
                    SessionOutgoingMessage::Error {
                        code: error.code.or(error.error_type),
                        message: error.message,
                    },
                )
                .await;
                return Some(CloseReason::RemoteRejected);
            }

            warn!(session_id = %session.id(), "Voice Live error: {}", error.message);
            forward(
                message_tx,
                SessionOutgoingMessage::Error {
                    code: error.code.or(error.error_type),
                    message: error.message,
                },
            )
            .await
        }

        ServerEvent::Unknown => {
            debug!(session_id = %session.id(), "Unhandled Voice Live event");
            None
        }
    }
}

/// Queue an outgoing message; a closed channel means the browser is gone.
async fn forward(
    message_tx: &mpsc::Sender<SessionMessageRoute>,
    message: SessionOutgoingMessage,
) -> Option<CloseReason> {
    if message_tx
        .send(SessionMessageRoute::Outgoing(message))
        .await
        .is_err()
    {
        Some(CloseReason::BrowserClosed)
    } else {
        None
    }
}
