//! Voice capture engine managing the record-then-transcribe lifecycle.
//!
//! The `VoiceCapture` engine owns the microphone and the transcription
//! service, drives them through a strict state machine, and finalizes each
//! recording into exactly one `AudioPayload`. The microphone is released
//! unconditionally when a recording stops, regardless of what transcription
//! does afterwards.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use carelink_audio::MicrophoneService;
use carelink_core::error::{CareError, Result};
use carelink_core::types::{AudioEncoding, AudioPayload};
use carelink_transcribe::TranscriptionService;

use crate::state::{CaptureState, StateMachine};
use crate::wav::encode_wav_pcm16;

/// Tracks the data associated with an active recording.
#[derive(Debug)]
pub struct RecordingSession {
    /// Unique identifier for this recording.
    pub id: Uuid,
    /// When the recording was started.
    pub start_time: DateTime<Utc>,
    /// Accumulated PCM samples.
    samples: Vec<f32>,
}

impl RecordingSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time: Utc::now(),
            samples: Vec::new(),
        }
    }

    /// Returns the elapsed duration of this recording in seconds.
    pub fn elapsed_secs(&self) -> f32 {
        let elapsed = Utc::now() - self.start_time;
        elapsed.num_milliseconds() as f32 / 1000.0
    }

    fn push_samples(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }
}

/// Proof of an active recording, returned by `start_recording` and consumed
/// by `stop_recording`. Not cloneable: there is exactly one per recording.
#[derive(Debug)]
pub struct RecordingHandle {
    id: Uuid,
}

/// The voice capture engine.
///
/// Generic over the microphone and transcription services so tests can
/// drive the full lifecycle with mocks.
pub struct VoiceCapture<M, T> {
    mic: M,
    transcriber: T,
    state: StateMachine,
    session: Mutex<Option<RecordingSession>>,
}

impl<M, T> VoiceCapture<M, T>
where
    M: MicrophoneService,
    T: TranscriptionService,
{
    /// Create an engine in the Idle state.
    pub fn new(mic: M, transcriber: T) -> Self {
        Self {
            mic,
            transcriber,
            state: StateMachine::new(),
            session: Mutex::new(None),
        }
    }

    /// Returns the current capture state.
    pub fn current_state(&self) -> CaptureState {
        self.state.current()
    }

    /// Borrow the microphone service (used by callers feeding samples).
    pub fn microphone(&self) -> &M {
        &self.mic
    }

    /// Start a new recording.
    ///
    /// Rejected unless Idle. Requests microphone access first: on denial the
    /// engine stays Idle and nothing is acquired. On success the engine
    /// transitions to Recording and begins buffering.
    pub async fn start_recording(&self) -> Result<RecordingHandle> {
        let current = self.state.current();
        if current != CaptureState::Idle {
            return Err(CareError::Recording(format!(
                "cannot start recording while {}",
                current
            )));
        }

        // Acquire before transitioning so a denial leaves the state untouched.
        self.mic.open().await?;
        self.state.transition(CaptureState::Recording)?;

        let session = RecordingSession::new();
        let handle = RecordingHandle { id: session.id };
        tracing::info!(session_id = %session.id, "Recording started");

        let mut guard = self.session.lock().expect("session mutex poisoned");
        *guard = Some(session);
        Ok(handle)
    }

    /// Push captured samples into the active recording.
    ///
    /// Only valid while Recording.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        if self.state.current() != CaptureState::Recording {
            return Err(CareError::Recording(
                "cannot push samples: not recording".to_string(),
            ));
        }

        let mut guard = self.session.lock().expect("session mutex poisoned");
        match guard.as_mut() {
            Some(session) => {
                session.push_samples(samples);
                Ok(())
            }
            None => Err(CareError::Recording(
                "no active recording to push samples to".to_string(),
            )),
        }
    }

    /// Stop the recording and finalize it into one payload.
    ///
    /// Transitions Recording -> Transcribing and releases the microphone
    /// unconditionally before anything else can fail: resource release is
    /// not contingent on transcription succeeding.
    pub async fn stop_recording(&self, handle: RecordingHandle) -> Result<AudioPayload> {
        {
            let guard = self.session.lock().expect("session mutex poisoned");
            match guard.as_ref() {
                Some(session) if session.id == handle.id => {}
                Some(_) => {
                    return Err(CareError::Recording("stale recording handle".to_string()))
                }
                None => return Err(CareError::Recording("no active recording".to_string())),
            }
        }

        self.state.transition(CaptureState::Transcribing)?;

        // Release the hardware first. A release error is logged, not
        // propagated: the stream is gone either way.
        if let Err(e) = self.mic.close().await {
            tracing::warn!(error = %e, "Microphone release reported an error");
        }

        // Drain whatever the stream buffered since the last push.
        let tail = self.mic.take_samples();

        let mut guard = self.session.lock().expect("session mutex poisoned");
        let mut session = guard
            .take()
            .ok_or_else(|| CareError::Recording("no active recording".to_string()))?;
        session.push_samples(&tail);

        let sample_rate = self.mic.sample_rate();
        let duration_secs = session.samples.len() as f32 / sample_rate as f32;
        tracing::info!(
            session_id = %session.id,
            elapsed_secs = session.elapsed_secs(),
            samples = session.samples.len(),
            "Recording finalized"
        );

        Ok(AudioPayload {
            data: encode_wav_pcm16(&session.samples, sample_rate),
            encoding: AudioEncoding::WavPcm16,
            duration_secs,
        })
    }

    /// Upload the finalized payload and return the recognized text.
    ///
    /// The engine returns to Idle whether transcription succeeds or fails;
    /// a failure surfaces as `CareError::Transcription` and no partial text
    /// is ever produced.
    pub async fn transcribe(&self, payload: AudioPayload) -> Result<String> {
        if self.state.current() != CaptureState::Transcribing {
            return Err(CareError::Recording(
                "no finalized recording to transcribe".to_string(),
            ));
        }

        let result = self.transcriber.transcribe(payload).await;
        self.state.transition(CaptureState::Idle)?;

        match &result {
            Ok(text) => tracing::info!(text_len = text.len(), "Recording transcribed"),
            Err(e) => tracing::warn!(error = %e, "Transcription failed"),
        }
        result
    }
}

// =============================================================================
// Tests
// =============================================================================
