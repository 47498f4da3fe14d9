//! Interaction mode state machine with thread-safe transitions.
//!
//! The mode is the single source of truth gating which user actions are
//! permitted. Valid transitions:
//! - Idle -> Sending (user submits non-empty text)
//! - Sending -> Idle (exchange resolved, success or failure)
//! - Idle -> Recording (microphone acquired)
//! - Recording -> Transcribing (recording stopped)
//! - Transcribing -> Idle (transcription completed or failed)
//!
//! While the mode is anything other than Idle, both the send action and the
//! start-recording action are disabled. The background poller runs outside
//! the mode entirely.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::SessionError;

/// The mutually-exclusive foreground activity of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    /// No foreground interaction. Send and record are both available.
    Idle,
    /// A user message exchange is in flight.
    Sending,
    /// A voice recording is being captured.
    Recording,
    /// A finalized recording is being transcribed.
    Transcribing,
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionMode::Idle => write!(f, "Idle"),
            InteractionMode::Sending => write!(f, "Sending"),
            InteractionMode::Recording => write!(f, "Recording"),
            InteractionMode::Transcribing => write!(f, "Transcribing"),
        }
    }
}

impl InteractionMode {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &InteractionMode) -> bool {
        matches!(
            (self, target),
            (InteractionMode::Idle, InteractionMode::Sending)
                | (InteractionMode::Sending, InteractionMode::Idle)
                | (InteractionMode::Idle, InteractionMode::Recording)
                | (InteractionMode::Recording, InteractionMode::Transcribing)
                | (InteractionMode::Transcribing, InteractionMode::Idle)
        )
    }
}

/// Thread-safe state machine for interaction mode transitions.
///
/// Wraps `InteractionMode` in an `Arc<Mutex<>>` so clones observe the same
/// mode. All transitions are validated before being applied.
#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: Arc<Mutex<InteractionMode>>,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeMachine {
    /// Create a new machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            mode: Arc::new(Mutex::new(InteractionMode::Idle)),
        }
    }

    /// Returns the current mode.
    pub fn current(&self) -> InteractionMode {
        *self.mode.lock().expect("mode mutex poisoned")
    }

    /// Attempt to transition to the target mode.
    pub fn transition(&self, target: InteractionMode) -> Result<(), SessionError> {
        let mut mode = self.mode.lock().expect("mode mutex poisoned");
        if mode.can_transition_to(&target) {
            tracing::debug!("Interaction mode: {} -> {}", *mode, target);
            *mode = target;
            Ok(())
        } else {
            Err(SessionError::InvalidMode {
                from: *mode,
                to: target,
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
