//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("INPUT/{0}")]
    InvalidInput(String),

    #[error("STAGE/UNKNOWN: {0}")]
    UnknownStage(String),

    #[error("GEN/{0}")]
    Generation(#[from] GenerationError),

    #[error("PROMPT/{0}")]
    Prompt(String),

    #[error("CONFIG/{0}")]
    Misconfiguration(String),
}

impl InterviewError {
    /// Whether the failure was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Failures of the text-generation backend.
///
/// Callers treat every variant as the same opaque failure; the variants exist
/// so logs say what actually went wrong.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("TIMEOUT after {0}ms")]
    Timeout(u64),

    #[error("AUTH: {0}")]
    Authentication(String),

    #[error("RATE: {0}")]
    RateLimited(String),

    #[error("BACKEND/{status}: {message}")]
    Backend { status: u16, message: String },

    #[error("TRANSPORT: {0}")]
    Transport(String),

    #[error("MALFORMED: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = InterviewError::UnknownStage("legacy_stage".to_string());
        assert_eq!(err.to_string(), "STAGE/UNKNOWN: legacy_stage");

        let err: InterviewError = GenerationError::Timeout(1500).into();
        assert_eq!(err.to_string(), "GEN/TIMEOUT after 1500ms");
        assert!(!err.is_client_error());

        assert!(InterviewError::InvalidInput("sessionId".into()).is_client_error());
    }
}
