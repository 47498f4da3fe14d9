//! Voice capture engine.
//!
//! Manages the record-then-transcribe lifecycle behind a strict state
//! machine: a recording is started against the microphone, finalized into a
//! single WAV payload, and uploaded for transcription. The recognized text
//! is staged by the caller, never sent automatically.

pub mod engine;
pub mod state;
pub mod wav;

pub use engine::{RecordingHandle, RecordingSession, VoiceCapture};
pub use state::{CaptureState, StateMachine};
pub use wav::encode_wav_pcm16;
