//! Error types for Composer operations

use crate::workflow::WorkflowError;

/// Result type for Composer operations
pub type Result<T> = std::result::Result<T, ComposerError>;

/// Error types for the Composer library
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model provider returned an error or could not be reached
    #[error("LLM error: {0}")]
    Llm(String),

    /// Workflow construction or execution error
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ComposerError {
    fn from(s: String) -> Self {
        ComposerError::Other(s)
    }
}

impl From<&str> for ComposerError {
    fn from(s: &str) -> Self {
        ComposerError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for ComposerError {
    fn from(err: anyhow::Error) -> Self {
        ComposerError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversions() {
        let err: ComposerError = "boom".into();
        assert_eq!(err.to_string(), "boom");

        let err: ComposerError = String::from("bang").into();
        assert!(matches!(err, ComposerError::Other(_)));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ComposerError = anyhow::anyhow!("upstream failed").into();
        assert_eq!(err.to_string(), "upstream failed");
    }

    #[test]
    fn test_workflow_error_wraps() {
        let err: ComposerError = WorkflowError::InvalidConfig("zero iterations".into()).into();
        assert_eq!(
            err.to_string(),
            "Workflow error: Invalid configuration: zero iterations"
        );
    }
}
