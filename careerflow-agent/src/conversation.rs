//! Open-ended chat agent.

use std::sync::Arc;

use careerflow_core::prelude::{ChunkStream, StreamChunk, Task};
use futures::stream::{self, StreamExt};

use crate::{
    agent_node::AgentNode, agent_types::AgentConfig, error::Result, model_client::ModelBackend,
};

pub const CONVERSATION_NODE_ID: &str = "conversation";

const CONVERSATION_PROMPT: &str = "你是一个友好、专业的智能助手。\
请用清晰、准确、有帮助的方式回答用户的问题；\
如果问题不明确，请先礼貌地询问用户的具体需求。";

/// General-purpose dialogue agent.
#[derive(Debug, Clone)]
pub struct ConversationAgent {
    node: AgentNode,
}

impl ConversationAgent {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        let config = AgentConfig::new(CONVERSATION_NODE_ID, "通用对话：回答各类日常问题")
            .with_system_prompt(CONVERSATION_PROMPT);
        Self {
            node: AgentNode::new(config, backend),
        }
    }

    pub fn node(&self) -> &AgentNode {
        &self.node
    }

    pub async fn execute(&self, task: &Task) -> Result<String> {
        self.node.execute(task).await
    }

    /// Leads with an empty chunk carrying the task's workflow state so the
    /// caller learns the state even when the model produces no fragments.
    pub fn stream_execute(&self, task: &Task) -> ChunkStream {
        let lead = StreamChunk::partial("", task.workflow_state.clone());
        stream::once(async move { lead })
            .chain(self.node.stream_execute(task))
            .boxed()
    }
}
