//! Error types for the session controller.

use carelink_core::error::CareError;

use crate::mode::InteractionMode;

/// Errors from the session controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is busy: {0}")]
    Busy(InteractionMode),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("no recording in progress")]
    NotRecording,
    #[error("session has ended")]
    Ended,
    #[error("invalid interaction mode transition: {from} -> {to}")]
    InvalidMode {
        from: InteractionMode,
        to: InteractionMode,
    },
    #[error(transparent)]
    Care(#[from] CareError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Busy(InteractionMode::Sending);
        assert_eq!(err.to_string(), "session is busy: Sending");

        let err = SessionError::EmptyMessage;
        assert_eq!(err.to_string(), "message cannot be empty");

        let err = SessionError::NotRecording;
        assert_eq!(err.to_string(), "no recording in progress");

        let err = SessionError::Ended;
        assert_eq!(err.to_string(), "session has ended");

        let err = SessionError::InvalidMode {
            from: InteractionMode::Idle,
            to: InteractionMode::Transcribing,
        };
        assert_eq!(
            err.to_string(),
            "invalid interaction mode transition: Idle -> Transcribing"
        );
    }

    #[test]
    fn test_session_error_from_care_error() {
        let care = CareError::ChatRequest("connection reset".to_string());
        let err: SessionError = care.into();
        assert!(matches!(err, SessionError::Care(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
