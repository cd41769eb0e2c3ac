//! HTTP and WebSocket request handlers

pub mod api;
pub mod session;

pub use session::session_handler;
