pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::BridgeConfig;
pub use core::*;
pub use errors::{SessionError, SessionResult};
pub use state::AppState;
