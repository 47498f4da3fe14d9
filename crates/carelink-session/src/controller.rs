//! The session controller.
//!
//! Owns the session state and is the only component that calls the chat
//! client, the follow-up poller, and the voice engine. The interaction mode
//! machine guarantees that at most one foreground operation is in flight;
//! the poller appends to the shared message log concurrently, in whatever
//! order completions resolve.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carelink_audio::MicrophoneService;
use carelink_chat::{AssistantClient, FollowupPoller};
use carelink_core::error::CareError;
use carelink_core::types::{Message, MessageLog};
use carelink_transcribe::TranscriptionService;
use carelink_voice::{RecordingHandle, VoiceCapture};

use crate::error::SessionError;
use crate::mode::{InteractionMode, ModeMachine};

/// A user-visible failure produced by a foreground operation.
///
/// Notices are rendered by the boundary and cleared when the next foreground
/// action starts. Poll failures never become notices; they are absorbed by
/// the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A greet or send exchange failed; the typed text was kept for retry.
    ChatRequestFailed(String),
    /// Microphone access was denied or no device was available.
    MicrophoneUnavailable(String),
    /// The recording could not be transcribed; the input field is unchanged.
    TranscriptionFailed(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::ChatRequestFailed(detail) => write!(f, "Message not sent: {}", detail),
            Notice::MicrophoneUnavailable(detail) => write!(f, "Microphone unavailable: {}", detail),
            Notice::TranscriptionFailed(detail) => write!(f, "Transcription failed: {}", detail),
        }
    }
}

/// Point-in-time view of the session for the boundary to render.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub user_id: String,
    pub messages: Vec<Message>,
    pub mode: InteractionMode,
    pub pending_input: String,
    pub notice: Option<Notice>,
}

/// Coordinates one user's session with the care assistant.
///
/// Generic over the chat client, microphone, and transcription services so
/// the full state machine is testable without a server or hardware.
pub struct SessionController<C, M, T> {
    user_id: String,
    client: Arc<C>,
    voice: VoiceCapture<M, T>,
    log: Arc<Mutex<MessageLog>>,
    mode: ModeMachine,
    pending_input: Mutex<String>,
    notice: Mutex<Option<Notice>>,
    recording: Mutex<Option<RecordingHandle>>,
    poller: FollowupPoller,
    ended: AtomicBool,
}

impl<C, M, T> SessionController<C, M, T>
where
    C: AssistantClient + 'static,
    M: MicrophoneService,
    T: TranscriptionService,
{
    /// Start a session for `user_id`.
    ///
    /// Requests the greeting, appends the agent's opening line, and starts
    /// the follow-up poller. A failed greeting propagates instead of
    /// producing a half-started session; the poller only runs after a
    /// successful greeting.
    pub async fn begin(
        client: Arc<C>,
        voice: VoiceCapture<M, T>,
        user_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<Self, SessionError> {
        let user_id = user_id.into();

        let greeting = client.greet(&user_id).await?;
        let log = Arc::new(Mutex::new(MessageLog::new()));
        log.lock()
            .expect("message log mutex poisoned")
            .append(Message::agent(greeting));
        tracing::info!(user_id = %user_id, "Session started");

        // The poller appends follow-ups in server order, under the same
        // brief lock a completing send uses. Append order is completion
        // order; no stronger causal ordering is imposed.
        let poll_log = Arc::clone(&log);
        let poller = FollowupPoller::start(
            Arc::clone(&client),
            user_id.clone(),
            poll_interval,
            move |batch| {
                let mut log = poll_log.lock().expect("message log mutex poisoned");
                for text in batch {
                    log.append(Message::agent(text));
                }
            },
        );

        Ok(Self {
            user_id,
            client,
            voice,
            log,
            mode: ModeMachine::new(),
            pending_input: Mutex::new(String::new()),
            notice: Mutex::new(None),
            recording: Mutex::new(None),
            poller,
            ended: AtomicBool::new(false),
        })
    }

    /// Submit a user message.
    ///
    /// Rejected while any foreground operation is active or when the text
    /// trims empty. The user message and the agent reply are appended only
    /// after the exchange resolves; a failed exchange appends nothing,
    /// keeps the text staged for retry, and records a notice.
    pub async fn send_message(&self, text: &str) -> Result<(), SessionError> {
        self.ensure_active()?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let mode = self.mode.current();
        if mode != InteractionMode::Idle {
            return Err(SessionError::Busy(mode));
        }
        self.mode.transition(InteractionMode::Sending)?;
        self.clear_notice();

        match self.client.send(&self.user_id, trimmed).await {
            Ok(reply) => {
                {
                    let mut log = self.log.lock().expect("message log mutex poisoned");
                    log.append(Message::user(trimmed));
                    log.append(Message::agent(reply));
                }
                self.pending_input
                    .lock()
                    .expect("pending input mutex poisoned")
                    .clear();
                self.mode.transition(InteractionMode::Idle)?;
                Ok(())
            }
            Err(e) => {
                // Nothing was appended; keep the text staged so the user
                // can retry, and surface the failure.
                *self
                    .pending_input
                    .lock()
                    .expect("pending input mutex poisoned") = trimmed.to_string();
                self.set_notice(Notice::ChatRequestFailed(e.to_string()));
                self.mode.transition(InteractionMode::Idle)?;
                Err(e.into())
            }
        }
    }

    /// Start a voice recording.
    ///
    /// Rejected while any foreground operation is active. A denied
    /// microphone leaves the mode Idle and records a notice.
    pub async fn start_recording(&self) -> Result<(), SessionError> {
        self.ensure_active()?;

        let mode = self.mode.current();
        if mode != InteractionMode::Idle {
            return Err(SessionError::Busy(mode));
        }
        self.clear_notice();

        match self.voice.start_recording().await {
            Ok(handle) => {
                self.mode.transition(InteractionMode::Recording)?;
                *self
                    .recording
                    .lock()
                    .expect("recording handle mutex poisoned") = Some(handle);
                Ok(())
            }
            Err(e) => {
                if matches!(e, CareError::MicrophoneUnavailable(_)) {
                    self.set_notice(Notice::MicrophoneUnavailable(e.to_string()));
                }
                Err(e.into())
            }
        }
    }

    /// Stop the recording and transcribe it.
    ///
    /// On success the recognized text is staged into the pending input; it
    /// is never sent automatically. On failure the pending input is left
    /// unchanged and a notice is recorded. The mode returns to Idle on both
    /// outcomes; the microphone was released by the stop itself.
    pub async fn stop_recording(&self) -> Result<(), SessionError> {
        self.ensure_active()?;

        if self.mode.current() != InteractionMode::Recording {
            return Err(SessionError::NotRecording);
        }
        let handle = self
            .recording
            .lock()
            .expect("recording handle mutex poisoned")
            .take()
            .ok_or(SessionError::NotRecording)?;

        self.mode.transition(InteractionMode::Transcribing)?;

        let result = match self.voice.stop_recording(handle).await {
            Ok(payload) => self.voice.transcribe(payload).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                *self
                    .pending_input
                    .lock()
                    .expect("pending input mutex poisoned") = text;
                self.mode.transition(InteractionMode::Idle)?;
                Ok(())
            }
            Err(e) => {
                if matches!(e, CareError::Transcription(_)) {
                    self.set_notice(Notice::TranscriptionFailed(e.to_string()));
                }
                self.mode.transition(InteractionMode::Idle)?;
                Err(e.into())
            }
        }
    }

    /// Replace the staged input text (mirrors the boundary's input field).
    pub fn set_pending_input(&self, text: impl Into<String>) {
        *self
            .pending_input
            .lock()
            .expect("pending input mutex poisoned") = text.into();
    }

    /// End the session: stop the poller and reject further operations.
    ///
    /// When this returns, no follow-up can be appended anymore, including
    /// one whose poll was in flight at call time.
    pub async fn end(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.poller.stop().await;
        tracing::info!(user_id = %self.user_id, "Session ended");
    }

    /// Point-in-time view of the session for rendering.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id.clone(),
            messages: self
                .log
                .lock()
                .expect("message log mutex poisoned")
                .snapshot(),
            mode: self.mode.current(),
            pending_input: self
                .pending_input
                .lock()
                .expect("pending input mutex poisoned")
                .clone(),
            notice: self.notice.lock().expect("notice mutex poisoned").clone(),
        }
    }

    /// Take the latest notice, clearing it.
    pub fn take_notice(&self) -> Option<Notice> {
        self.notice.lock().expect("notice mutex poisoned").take()
    }

    /// Borrow the voice engine (used by callers feeding captured samples).
    pub fn voice(&self) -> &VoiceCapture<M, T> {
        &self.voice
    }

    /// The user this session belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.ended.load(Ordering::SeqCst) {
            return Err(SessionError::Ended);
        }
        Ok(())
    }

    fn set_notice(&self, notice: Notice) {
        *self.notice.lock().expect("notice mutex poisoned") = Some(notice);
    }

    fn clear_notice(&self) {
        *self.notice.lock().expect("notice mutex poisoned") = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
