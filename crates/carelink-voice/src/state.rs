//! Capture state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for the voice capture lifecycle:
//! - Idle -> Recording (microphone acquired)
//! - Recording -> Transcribing (recording finalized, microphone released)
//! - Transcribing -> Idle (transcription completed or failed)
//!
//! There is no cancel path: the only way out of Recording is stopping the
//! recording, and the only way out of Transcribing is completion or a
//! reported failure. A denied microphone never leaves Idle.

use std::fmt;
use std::sync::{Arc, Mutex};

use carelink_core::error::CareError;

/// Operational state of the voice capture engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// No recording in progress. Ready to start.
    Idle,
    /// Microphone acquired, buffering audio.
    Recording,
    /// Recording finalized, upload for transcription in progress.
    Transcribing,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Recording => write!(f, "Recording"),
            CaptureState::Transcribing => write!(f, "Transcribing"),
        }
    }
}

impl CaptureState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &CaptureState) -> bool {
        matches!(
            (self, target),
            (CaptureState::Idle, CaptureState::Recording)
                | (CaptureState::Recording, CaptureState::Transcribing)
                | (CaptureState::Transcribing, CaptureState::Idle)
        )
    }
}

/// Thread-safe state machine for capture state transitions.
///
/// Wraps `CaptureState` in an `Arc<Mutex<>>` so clones observe the same
/// state. All transitions are validated before being applied, returning an
/// error if the requested transition is not permitted.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<CaptureState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> CaptureState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    ///
    /// Returns `Ok(())` if the transition is valid, or a
    /// `CareError::Recording` if it is not allowed from the current state.
    pub fn transition(&self, target: CaptureState) -> Result<(), CareError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Capture state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(CareError::Recording(format!(
                "invalid state transition: {} -> {}",
                *state, target
            )))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
