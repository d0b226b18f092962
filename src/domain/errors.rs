//! Domain errors for the cartguard widget controller.

use thiserror::Error;

/// Domain-level errors raised by phase bodies, the observer and collaborators.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A port call failed.
    #[error("Collaborator call {operation} failed: {message}")]
    Collaborator {
        /// Port operation name.
        operation: String,
        /// Failure detail.
        message: String,
    },

    /// The widget cannot be drawn right now.
    #[error("Render target unavailable: {0}")]
    RenderTargetUnavailable(String),

    /// Quote data is unusable.
    #[error("Invalid quote: {0}")]
    InvalidQuote(String),

    /// Payload (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The receiving side is gone.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Input rejected.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl DomainError {
    /// Shorthand for a failed collaborator call.
    pub fn collaborator(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_display() {
        let err = DomainError::collaborator("fetch_quote", "connection reset");
        assert_eq!(
            err.to_string(),
            "Collaborator call fetch_quote failed: connection reset"
        );
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: DomainError = parse.unwrap_err().into();
        assert!(matches!(err, DomainError::Serialization(_)));
    }
}
