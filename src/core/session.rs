//! Per-session lifecycle and turn state.
//!
//! One [`Session`] exists per connected browser. It is the single shared
//! record both relay loops consult before forwarding anything, which is what
//! keeps interrupt and teardown behavior consistent no matter which side an
//! event arrives from.
//!
//! # Lifecycle
//!
//! ```text
//! SettingUp ──▶ Active ◀──▶ Interrupted
//!                  │             │
//!                  └──▶ Closing ◀┘
//!                          │
//!                          ▼
//!                        Closed
//! ```
//!
//! Interrupted is entered when the caller barges in over assistant playback
//! and left when the remote acknowledges the cancellation (a `response.done`
//! or a fresh `response.created`) or when [`INTERRUPT_ACK_TIMEOUT`] passes
//! without one.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

/// How long assistant audio stays suppressed after an interrupt when no
/// acknowledgement arrives. The ack normally lands within tens of
/// milliseconds; past this deadline delivery resumes on its own.
pub const INTERRUPT_ACK_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Phases
// =============================================================================

/// Coarse lifecycle phase of a bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Remote connection is up but the configuration ack has not arrived
    SettingUp,
    /// Both links live, audio flowing
    Active,
    /// Caller barged in; assistant audio suppressed until the remote
    /// acknowledges the cancellation
    Interrupted,
    /// Teardown started, nothing is forwarded anymore
    Closing,
    /// Both links released
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::SettingUp => "setting_up",
            SessionPhase::Active => "active",
            SessionPhase::Interrupted => "interrupted",
            SessionPhase::Closing => "closing",
            SessionPhase::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Whose turn the conversation is in, per server-side VAD and response
/// lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nobody is speaking and no response is in flight
    Idle,
    /// Server VAD detected caller speech
    UserSpeaking,
    /// A response exists but no audio for it has arrived yet
    ResponseActive,
    /// Assistant audio is streaming
    AssistantSpeaking,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::Idle => "idle",
            TurnState::UserSpeaking => "user_speaking",
            TurnState::ResponseActive => "response_active",
            TurnState::AssistantSpeaking => "assistant_speaking",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    turn: TurnState,
    remote_session_id: Option<String>,
    /// Set while Interrupted; suppression ends at this instant if no
    /// acknowledgement arrives first
    interrupt_deadline: Option<Instant>,
}

/// Shared per-session state record.
///
/// Cheap to clone; every clone refers to the same session. All transitions
/// happen under one lock so the two relay loops always observe a consistent
/// phase.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    /// Create a session in the SettingUp phase.
    pub fn new() -> Self {
        Session {
            id: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(SessionState {
                phase: SessionPhase::SettingUp,
                turn: TurnState::Idle,
                remote_session_id: None,
                interrupt_deadline: None,
            })),
        }
    }

    /// Bridge-assigned session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    /// Current turn state.
    pub fn turn(&self) -> TurnState {
        self.inner.lock().turn
    }

    /// Remote-assigned session identifier, once the configuration ack has
    /// arrived.
    pub fn remote_session_id(&self) -> Option<String> {
        self.inner.lock().remote_session_id.clone()
    }

    /// SettingUp -> Active on the remote configuration ack.
    ///
    /// Returns true exactly once; a repeated ack or an ack arriving during
    /// teardown returns false and changes nothing.
    pub fn activate(&self, remote_session_id: &str) -> bool {
        let mut state = self.inner.lock();
        if state.phase == SessionPhase::SettingUp {
            state.phase = SessionPhase::Active;
            state.remote_session_id = Some(remote_session_id.to_string());
            true
        } else {
            false
        }
    }

    /// Active -> Interrupted on a caller barge-in.
    ///
    /// Returns true when the transition happened and the remote should be
    /// sent a cancellation. An interrupt in any other phase (including a
    /// repeat while already Interrupted) returns false.
    pub fn begin_interrupt(&self, now: Instant) -> bool {
        let mut state = self.inner.lock();
        if state.phase == SessionPhase::Active {
            state.phase = SessionPhase::Interrupted;
            state.interrupt_deadline = Some(now + INTERRUPT_ACK_TIMEOUT);
            true
        } else {
            false
        }
    }

    /// Record a new response starting. Acknowledges a pending interrupt:
    /// the remote has moved on, so suppression ends.
    pub fn response_started(&self) {
        let mut state = self.inner.lock();
        state.turn = TurnState::ResponseActive;
        Self::clear_interrupt(&mut state);
    }

    /// Record a response finishing. Also the acknowledgement path for a
    /// cancelled response.
    pub fn response_finished(&self) {
        let mut state = self.inner.lock();
        state.turn = TurnState::Idle;
        Self::clear_interrupt(&mut state);
    }

    /// Set the turn state without touching the phase.
    pub fn set_turn(&self, turn: TurnState) {
        self.inner.lock().turn = turn;
    }

    /// Whether caller audio may be forwarded to the remote. True while
    /// Active or Interrupted: the caller keeps talking through a barge-in.
    pub fn may_forward_audio(&self) -> bool {
        matches!(
            self.inner.lock().phase,
            SessionPhase::Active | SessionPhase::Interrupted
        )
    }

    /// Whether an assistant audio chunk must be discarded instead of
    /// delivered.
    ///
    /// False while Active. While Interrupted, true until the deadline;
    /// once the deadline passes the session resumes Active and delivery
    /// restarts. Any other phase discards.
    pub fn suppress_playback(&self, now: Instant) -> bool {
        let mut state = self.inner.lock();
        match state.phase {
            SessionPhase::Active => false,
            SessionPhase::Interrupted => match state.interrupt_deadline {
                Some(deadline) if now < deadline => true,
                _ => {
                    // No acknowledgement within the window; resume delivery
                    state.phase = SessionPhase::Active;
                    state.interrupt_deadline = None;
                    false
                }
            },
            _ => true,
        }
    }

    /// Transition into Closing. Returns true for the first caller only, so
    /// teardown runs once no matter how many loops hit a terminal condition
    /// at the same time.
    pub fn begin_close(&self) -> bool {
        let mut state = self.inner.lock();
        match state.phase {
            SessionPhase::Closing | SessionPhase::Closed => false,
            _ => {
                state.phase = SessionPhase::Closing;
                state.interrupt_deadline = None;
                true
            }
        }
    }

    /// Mark teardown complete.
    pub fn finish_close(&self) {
        let mut state = self.inner.lock();
        state.phase = SessionPhase::Closed;
        state.turn = TurnState::Idle;
    }

    fn clear_interrupt(state: &mut SessionState) {
        if state.phase == SessionPhase::Interrupted {
            state.phase = SessionPhase::Active;
            state.interrupt_deadline = None;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
