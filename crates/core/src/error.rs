//! Error types for annotation authoring and synchronization

/// Failure reason reported by a document engine task
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("engine operation failed: {0}")]
    Failed(String),
    #[error("engine operation cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    /// Missing document, page, annotation or tool
    #[error("{0} not found")]
    NotFound(String),
    #[error("document engine failure: {0}")]
    EngineFailure(#[from] EngineError),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type AnnotationResult<T> = Result<T, AnnotationError>;
