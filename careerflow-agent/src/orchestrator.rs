//! Top-level turn handling: route, dispatch, normalize.

use std::sync::Arc;

use careerflow_core::prelude::{ChunkStream, Message, Task, WorkflowState};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::{
    agent_types::{ModelConfig, RetryPolicy},
    conversation::ConversationAgent,
    coordinator::{CoordinatorAgent, Route},
    error::Result,
    model_client::{ModelBackend, ModelClient},
    protocol::{TurnOutcome, collect_turn, pass_through},
    workflow::CareerWorkflow,
};

/// One inbound turn. History and state come from the caller's own storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub query: String,
    pub session_id: String,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub workflow_state: Option<WorkflowState>,
}

impl TurnRequest {
    pub fn new(query: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: session_id.into(),
            history: Vec::new(),
            workflow_state: None,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_workflow_state(mut self, workflow_state: Option<WorkflowState>) -> Self {
        self.workflow_state = workflow_state;
        self
    }
}

/// Routes each turn to the conversation agent or the career workflow.
///
/// Holds no per-session state; concurrent turns can share one instance.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    coordinator: CoordinatorAgent,
    conversation: ConversationAgent,
    workflow: CareerWorkflow,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ModelBackend>, retry: RetryPolicy) -> Self {
        Self {
            coordinator: CoordinatorAgent::with_retry(Arc::clone(&backend), retry),
            conversation: ConversationAgent::new(Arc::clone(&backend)),
            workflow: CareerWorkflow::new(backend),
        }
    }

    /// Build on a genai-backed client. Fails fast on invalid configuration.
    pub fn from_config(config: ModelConfig) -> Result<Self> {
        let client = ModelClient::new(config)?;
        Ok(Self::new(Arc::new(client), RetryPolicy::default()))
    }

    pub fn coordinator(&self) -> &CoordinatorAgent {
        &self.coordinator
    }

    /// Route the turn and return its normalized chunk stream.
    pub async fn handle_turn(&self, request: TurnRequest) -> ChunkStream {
        let span = info_span!(
            "turn",
            turn_id = %Uuid::new_v4(),
            session_id = %request.session_id
        );
        self.dispatch(request).instrument(span).await
    }

    /// [`Self::handle_turn`] drained into what a caller persists.
    pub async fn run_turn(&self, request: TurnRequest) -> TurnOutcome {
        collect_turn(self.handle_turn(request).await).await
    }

    async fn dispatch(&self, request: TurnRequest) -> ChunkStream {
        let task = Task::new(request.query)
            .with_history(request.history)
            .with_workflow_state(request.workflow_state);

        let decision = self.coordinator.route(&task).await;
        info!(route = %decision.node_id, reasoning = %decision.reasoning, "Dispatching turn");

        match decision.node_id {
            Route::Conversation => {
                let initial = task.workflow_state.clone();
                pass_through(self.conversation.stream_execute(&task), initial)
            }
            Route::CareerPositioning => {
                let state = match task.workflow_state {
                    Some(ref state) if state.is_active_career_positioning() => state.clone(),
                    _ => {
                        info!("Starting a new career-positioning workflow");
                        WorkflowState::career_positioning()
                    }
                };
                let task = task.with_workflow_state(Some(state.clone()));
                pass_through(self.workflow.stream_execute(&task), Some(state))
            }
        }
    }
}
