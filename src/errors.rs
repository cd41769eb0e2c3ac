//! Error types for bridge sessions
//!
//! Every failure a session can hit maps onto one of a few kinds: bad or
//! missing server configuration, a failed connection attempt to the remote
//! endpoint, a malformed message from either side, or a dropped connection.
//! Configuration and connect errors are fatal before the session starts;
//! protocol errors are recoverable or terminal depending on where they
//! surface.

use thiserror::Error;

/// Errors raised while setting up or running a bridge session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing or invalid server-held credentials, or the remote endpoint
    /// rejected the session configuration. Fatal: the session never starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote endpoint could not be reached or refused the WebSocket
    /// handshake.
    #[error("Voice Live connection failed: {0}")]
    Connect(String),

    /// Malformed or unexpected message from the remote endpoint. Logged;
    /// the session continues when the message can be skipped.
    #[error("Remote protocol error: {0}")]
    RemoteProtocol(String),

    /// Malformed envelope from the browser. The message is dropped and the
    /// session continues.
    #[error("Client protocol error: {0}")]
    ClientProtocol(String),

    /// Either underlying connection went away.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
