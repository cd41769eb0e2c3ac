//! HTTP and WebSocket route configuration

pub mod api;
pub mod session;
