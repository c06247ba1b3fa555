//! Error types for the clickhist workspace.

use thiserror::Error;

/// Result type alias using ClickHistError.
pub type ClickHistResult<T> = Result<T, ClickHistError>;

/// Primary error type for histogram, selection and case recording.
#[derive(Debug, Error)]
pub enum ClickHistError {
    // === Construction Errors (fatal at startup) ===
    #[error("Shape mismatch: x is {x:?}, y is {y:?}")]
    ShapeMismatch { x: [usize; 3], y: [usize; 3] },

    #[error("Invalid bin edges for '{variable}': {message}")]
    InvalidEdges { variable: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Data Errors ===
    #[error("Failed to read data: {0}")]
    DataReadError(String),

    // === Session Errors ===
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Artifact generation failed: {0}")]
    ArtifactGenerationFailed(String),

    #[error("Case log append failed: {0}")]
    LogAppendFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClickHistError {
    /// Create an InvalidEdges error.
    pub fn invalid_edges(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEdges {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidSelection error.
    pub fn invalid_selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether an interactive session can keep going after this error.
    ///
    /// Construction errors abort startup; everything raised by a collaborator
    /// during a session leaves the selection intact so the user can retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClickHistError::InvalidSelection(_)
                | ClickHistError::ArtifactGenerationFailed(_)
                | ClickHistError::LogAppendFailed(_)
        )
    }

    /// Short stable code for user-facing messages and log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClickHistError::ShapeMismatch { .. } => "ShapeMismatch",
            ClickHistError::InvalidEdges { .. } => "InvalidEdges",
            ClickHistError::InvalidConfig(_) => "InvalidConfig",
            ClickHistError::InvalidBbox(_) => "InvalidBbox",
            ClickHistError::InvalidTime(_) => "InvalidTime",
            ClickHistError::DataReadError(_) => "DataReadError",
            ClickHistError::InvalidSelection(_) => "InvalidSelection",
            ClickHistError::ArtifactGenerationFailed(_) => "ArtifactGenerationFailed",
            ClickHistError::LogAppendFailed(_) => "LogAppendFailed",
            ClickHistError::Internal(_) => "Internal",
        }
    }
}

impl From<std::io::Error> for ClickHistError {
    fn from(err: std::io::Error) -> Self {
        ClickHistError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ClickHistError {
    fn from(err: serde_json::Error) -> Self {
        ClickHistError::DataReadError(format!("JSON error: {}", err))
    }
}
