pub mod registry;
pub mod session;
pub mod voicelive;

// Re-export commonly used types for convenience
pub use registry::SessionRegistry;
pub use session::{INTERRUPT_ACK_TIMEOUT, Session, SessionPhase, TurnState};
pub use voicelive::{VoiceLiveConfig, VoiceLiveHandle};
