//! # careerflow-agent
//!
//! LLM-backed agents for the careerflow router: a coordinator that picks a
//! route per turn, a general conversation agent, and the four-phase
//! career-positioning workflow.
//!
//! ```rust,no_run
//! use careerflow_agent::prelude::*;
//!
//! # async fn demo() -> careerflow_agent::Result<()> {
//! let orchestrator = Orchestrator::from_config(ModelConfig::from_env()?)?;
//! let outcome = orchestrator
//!     .run_turn(TurnRequest::new("我想了解职业规划", "session-1"))
//!     .await;
//! println!("{}", outcome.content);
//! # Ok(())
//! # }
//! ```

pub mod agent_node;
pub mod agent_types;
pub mod conversation;
pub mod coordinator;
pub mod error;
pub mod model_client;
pub mod orchestrator;
pub mod parsing;
pub mod protocol;
pub mod scripted;
pub mod workflow;

// Re-exports for convenience
pub use agent_node::{AgentNode, NodeEvent, failure_notice};
pub use agent_types::{AgentConfig, ModelConfig, ModelParameters, RetryPolicy};
pub use error::{AgentError, Result};
pub use model_client::{ModelBackend, ModelClient, TextStream};
pub use orchestrator::{Orchestrator, TurnRequest};

/// Prelude module for convenient imports
pub mod prelude {
    pub use careerflow_core::prelude::*;

    pub use crate::{
        agent_node::{AgentNode, NodeEvent},
        agent_types::{AgentConfig, ModelConfig, ModelParameters, RetryPolicy},
        conversation::ConversationAgent,
        coordinator::{CoordinatorAgent, Route, RouteDecision},
        error::{AgentError, Result},
        model_client::{ModelBackend, ModelClient},
        orchestrator::{Orchestrator, TurnRequest},
        protocol::{TurnOutcome, buffered, collect_turn, pass_through, sse_stream},
        scripted::{Reply, ScriptedBackend},
        workflow::CareerWorkflow,
    };
}
