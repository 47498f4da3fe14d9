use thiserror::Error;

/// Top-level error type for the Carelink client.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates return
/// `CareError` directly so that the `?` operator works across crate
/// boundaries; the session crate layers its own error type on top via
/// `From<CareError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CareError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat request failed: {0}")]
    ChatRequest(String),

    #[error("Follow-up poll failed: {0}")]
    Poll(String),

    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CareError {
    fn from(err: toml::de::Error) -> Self {
        CareError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CareError {
    fn from(err: toml::ser::Error) -> Self {
        CareError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CareError {
    fn from(err: serde_json::Error) -> Self {
        CareError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CareError>;
