use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation types
// =============================================================================

/// Who authored a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person using the client.
    User,
    /// The remote care assistant.
    Agent,
}

/// One entry in the conversation timeline.
///
/// Messages are immutable once created; insertion order into the
/// [`MessageLog`] is conversation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    /// Build a message authored by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// Build a message authored by the agent.
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Agent,
            text: text.into(),
        }
    }
}

/// Append-only ordered record of the conversation.
///
/// The log exposes no removal or mutation operation: its length only grows
/// for the lifetime of a session. The log itself is not thread-safe; callers
/// that share it across tasks serialize appends through a brief external
/// lock (the session controller owns that lock).
#[derive(Clone, Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, returning the new length of the log.
    pub fn append(&mut self, message: Message) -> usize {
        self.entries.push(message);
        self.entries.len()
    }

    /// Number of messages recorded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no messages yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time copy of the full conversation, in append order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.entries.clone()
    }

    /// Borrow the entries in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.entries.iter()
    }
}

// =============================================================================
// Audio types
// =============================================================================

/// Declared encoding of a finalized recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    /// 16-bit little-endian PCM samples in a WAV container.
    WavPcm16,
}

impl AudioEncoding {
    /// MIME type used when uploading a payload of this encoding.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::WavPcm16 => "audio/wav",
        }
    }

    /// File name used for the multipart upload part.
    pub fn file_name(&self) -> &'static str {
        match self {
            AudioEncoding::WavPcm16 => "recording.wav",
        }
    }
}

/// An opaque finalized recording.
///
/// Produced once per recording session by the voice engine's finalize step
/// and consumed by value exactly once by the transcription upload.
#[derive(Clone, Debug)]
pub struct AudioPayload {
    /// Encoded audio bytes.
    pub data: Vec<u8>,
    /// Encoding the bytes are in.
    pub encoding: AudioEncoding,
    /// Duration of the recording in seconds.
    pub duration_secs: f32,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let m = Message::user("hello");
        assert_eq!(m.sender, Sender::User);
        assert_eq!(m.text, "hello");

        let m = Message::agent("hi there");
        assert_eq!(m.sender, Sender::Agent);
        assert_eq!(m.text, "hi there");
    }

    #[test]
    fn test_sender_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Sender::Agent).unwrap(), "\"agent\"");

        let s: Sender = serde_json::from_str("\"agent\"").unwrap();
        assert_eq!(s, Sender::Agent);
    }

    #[test]
    fn test_log_append_returns_new_length() {
        let mut log = MessageLog::new();
        assert_eq!(log.append(Message::agent("a")), 1);
        assert_eq!(log.append(Message::user("b")), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_log_preserves_append_order() {
        let mut log = MessageLog::new();
        log.append(Message::agent("first"));
        log.append(Message::user("second"));
        log.append(Message::agent("third"));

        let texts: Vec<&str> = log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_log_snapshot_is_point_in_time() {
        let mut log = MessageLog::new();
        log.append(Message::agent("before"));
        let snap = log.snapshot();
        log.append(Message::user("after"));

        // The snapshot taken earlier does not see the later append.
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].text, "before");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_log_length_non_decreasing() {
        let mut log = MessageLog::new();
        let mut last = 0;
        for i in 0..10 {
            let len = log.append(Message::user(format!("m{}", i)));
            assert!(len > last);
            last = len;
        }
    }

    #[test]
    fn test_log_empty() {
        let log = MessageLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_audio_encoding_metadata() {
        assert_eq!(AudioEncoding::WavPcm16.mime_type(), "audio/wav");
        assert_eq!(AudioEncoding::WavPcm16.file_name(), "recording.wav");
    }

    #[test]
    fn test_audio_payload_fields() {
        let payload = AudioPayload {
            data: vec![1, 2, 3],
            encoding: AudioEncoding::WavPcm16,
            duration_secs: 0.5,
        };
        assert_eq!(payload.data.len(), 3);
        assert_eq!(payload.encoding, AudioEncoding::WavPcm16);
    }
}
