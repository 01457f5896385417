//! Error types for careerflow-core.

use thiserror::Error;

/// Result type for workflow state operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Error types that can occur while manipulating workflow state.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Invalid phase transition.
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Source phase
        from: String,
        /// Target phase
        to: String,
    },

    /// The state names a workflow this crate does not know.
    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    /// Serialization/Deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// Create a new invalid transition error.
    pub fn invalid_transition(from: impl std::fmt::Debug, to: impl std::fmt::Debug) -> Self {
        Self::InvalidTransition {
            from: format!("{from:?}"),
            to: format!("{to:?}"),
        }
    }

    /// Create a new unknown workflow error.
    pub fn unknown_workflow(id: impl Into<String>) -> Self {
        Self::UnknownWorkflow(id.into())
    }
}
