//! Speech-to-text transcription of finalized recordings.
//!
//! Provides a trait-based abstraction over the server's `/transcribe`
//! endpoint, along with a mock implementation for testing without a server.
//! A payload is consumed by value: it is uploaded exactly once and never
//! retained.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;

use carelink_core::error::{CareError, Result};
use carelink_core::types::AudioPayload;

// =============================================================================
// Trait
// =============================================================================

/// Service that turns a finalized recording into text.
///
/// On failure no partial or garbled text is ever surfaced: the caller gets
/// `CareError::Transcription` and leaves its input field unchanged.
pub trait TranscriptionService: Send + Sync {
    /// Upload the payload and return the recognized text.
    fn transcribe(&self, payload: AudioPayload) -> impl Future<Output = Result<String>> + Send;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// Response body of `POST /transcribe`.
///
/// The server returns `{"transcription": ...}` on success and
/// `{"error": ...}` on recognition failure; both arrive with a 200 family
/// status from some deployments, so both fields are modeled.
#[derive(Debug, Deserialize)]
struct TranscribeReply {
    transcription: Option<String>,
    error: Option<String>,
}

/// `TranscriptionService` uploading multipart WAV to the assistant server.
pub struct HttpTranscriptionService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTranscriptionService {
    /// Create a service for the given server base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CareError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

impl TranscriptionService for HttpTranscriptionService {
    async fn transcribe(&self, payload: AudioPayload) -> Result<String> {
        let url = format!("{}/transcribe", self.base_url);
        let byte_count = payload.data.len();

        let part = reqwest::multipart::Part::bytes(payload.data)
            .file_name(payload.encoding.file_name())
            .mime_str(payload.encoding.mime_type())
            .map_err(|e| CareError::Transcription(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        tracing::debug!(bytes = byte_count, "Uploading recording for transcription");

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CareError::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CareError::Transcription(format!(
                "server returned {}",
                status
            )));
        }

        let reply: TranscribeReply = response
            .json()
            .await
            .map_err(|e| CareError::Transcription(format!("malformed response: {}", e)))?;

        if let Some(error) = reply.error {
            return Err(CareError::Transcription(error));
        }
        reply
            .transcription
            .ok_or_else(|| CareError::Transcription("response carried no transcription".into()))
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock transcription service returning a fixed text or a scripted failure.
///
/// Records the byte length of every uploaded payload so tests can assert
/// the payload was consumed.
pub struct MockTranscriptionService {
    text: Option<String>,
    uploads: Mutex<Vec<usize>>,
}

impl MockTranscriptionService {
    /// Always recognize `text`.
    pub fn recognizing(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with `CareError::Transcription`.
    pub fn failing() -> Self {
        Self {
            text: None,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Byte lengths of payloads uploaded so far, in call order.
    pub fn upload_sizes(&self) -> Vec<usize> {
        self.uploads.lock().expect("uploads mutex poisoned").clone()
    }
}

impl TranscriptionService for MockTranscriptionService {
    async fn transcribe(&self, payload: AudioPayload) -> Result<String> {
        if payload.data.is_empty() {
            return Err(CareError::Transcription(
                "cannot transcribe an empty recording".to_string(),
            ));
        }
        self.uploads
            .lock()
            .expect("uploads mutex poisoned")
            .push(payload.data.len());
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => Err(CareError::Transcription(
                "recognition failed".to_string(),
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::types::AudioEncoding;

    fn payload(bytes: usize) -> AudioPayload {
        AudioPayload {
            data: vec![0u8; bytes],
            encoding: AudioEncoding::WavPcm16,
            duration_secs: 1.0,
        }
    }

    #[tokio::test]
    async fn test_mock_recognizing() {
        let service = MockTranscriptionService::recognizing("I need water");
        let text = service.transcribe(payload(64)).await.unwrap();
        assert_eq!(text, "I need water");
        assert_eq!(service.upload_sizes(), vec![64]);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let service = MockTranscriptionService::failing();
        let err = service.transcribe(payload(64)).await.unwrap_err();
        assert!(matches!(err, CareError::Transcription(_)));
    }

    #[tokio::test]
    async fn test_mock_rejects_empty_payload() {
        let service = MockTranscriptionService::recognizing("text");
        let err = service.transcribe(payload(0)).await.unwrap_err();
        assert!(matches!(err, CareError::Transcription(_)));
        assert!(service.upload_sizes().is_empty());
    }

    #[test]
    fn test_reply_parses_success_body() {
        let reply: TranscribeReply =
            serde_json::from_str(r#"{"transcription":"I need water"}"#).unwrap();
        assert_eq!(reply.transcription.as_deref(), Some("I need water"));
        assert!(reply.error.is_none());
    }

    #[test]
    fn test_reply_parses_error_body() {
        let reply: TranscribeReply =
            serde_json::from_str(r#"{"error":"could not recognize speech"}"#).unwrap();
        assert!(reply.transcription.is_none());
        assert_eq!(reply.error.as_deref(), Some("could not recognize speech"));
    }

    #[tokio::test]
    async fn test_http_service_rejects_unreachable_server() {
        let service =
            HttpTranscriptionService::new("http://127.0.0.1:1", Duration::from_millis(200))
                .unwrap();
        let err = service.transcribe(payload(16)).await.unwrap_err();
        assert!(matches!(err, CareError::Transcription(_)));
    }
}
