//! Error types for careerflow agent operations.

use careerflow_core::prelude::FlowError;
use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Main error type for agent operations.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Model error in node {node}: {message}")]
    Model { node: String, message: String },

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a backend (transport or remote service) error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a model error attributed to a node
    pub fn model(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Create a malformed output error
    pub fn malformed_output(message: impl Into<String>) -> Self {
        Self::MalformedOutput(message.into())
    }

    /// Create a workflow logic error
    pub fn workflow(message: impl Into<String>) -> Self {
        Self::Workflow(message.into())
    }

    /// Create a streaming error
    pub fn streaming(message: impl Into<String>) -> Self {
        Self::Streaming(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Attribute a backend failure to the node that issued the call.
    pub fn in_node(self, node: &str) -> Self {
        match self {
            Self::Backend(message) | Self::Streaming(message) => Self::model(node, message),
            other => other,
        }
    }

    /// Check if the error is retryable.
    ///
    /// Only transport/backend failures qualify; malformed output is assumed
    /// to recur and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::Model { .. } | Self::Streaming(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Backend(_) => "backend",
            Self::Model { .. } => "model",
            Self::MalformedOutput(_) => "malformed_output",
            Self::Workflow(_) => "workflow",
            Self::Streaming(_) => "streaming",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<genai::Error> for AgentError {
    fn from(err: genai::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<FlowError> for AgentError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Serialization(e) => Self::Serialization(e.to_string()),
            other => Self::Workflow(other.to_string()),
        }
    }
}
