//! # careerflow-core
//!
//! Data model shared by the careerflow agents.
//!
//! ## Core Concepts
//!
//! - **Message / Task**: conversation history plus the query for one turn
//! - **WorkflowState**: serializable `{workflowId, phase, progress}` handed
//!   back and forth between caller and workflow
//! - **StreamChunk**: one unit of a streamed turn; exactly one is terminal
//!
//! ## Quick Start
//!
//! ```rust
//! use careerflow_core::prelude::*;
//!
//! let state = WorkflowState::career_positioning();
//! assert_eq!(state.phase, Phase::InfoCollection);
//!
//! let next = state.advance_to(Phase::Assessment).unwrap();
//! assert_eq!(next.progress, 0);
//! assert!(next.advance_to(Phase::InfoCollection).is_err());
//! ```

pub mod chunk;
pub mod error;
pub mod message;
pub mod state;

/// Convenient re-exports for common use.
pub mod prelude {
    pub use crate::{
        chunk::{ChunkStream, StreamChunk},
        error::{FlowError, Result},
        message::{Message, Role, Task},
        state::{CAREER_POSITIONING, FlowState, Phase, StateTransition, WorkflowState},
    };
}
