//! Analysis specialist: a single pass over the collected material.

use std::sync::Arc;

use careerflow_core::prelude::{ChunkStream, Message, Phase, StreamChunk, Task, WorkflowState};
use tracing::info;

use super::{history::relevant_history, relay};
use crate::{agent_node::AgentNode, agent_types::AgentConfig, model_client::ModelBackend};

pub const ANALYSIS_NODE_ID: &str = "analysis";

const ANALYSIS_PROMPT: &str = "你是一名专业的职业分析师。\
你会看到用户在信息收集阶段提供的背景资料，以及职业测评中的问题和用户的选择。\
请据此分析用户的性格特点、能力优势、兴趣倾向和职业价值观，语言客观、具体、有条理。";

const ANALYSIS_INSTRUCTION: &str = "请根据以上对话中的背景信息和测评答案，\
输出一份职业分析报告，包括：1. 性格特点；2. 能力优势；3. 兴趣倾向；4. 职业价值观；5. 适合的职业方向概述。";

#[derive(Debug, Clone)]
pub struct AnalysisAgent {
    node: AgentNode,
}

impl AnalysisAgent {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        let config = AgentConfig::new(ANALYSIS_NODE_ID, "职业分析：综合背景与测评结果")
            .with_system_prompt(ANALYSIS_PROMPT);
        Self {
            node: AgentNode::new(config, backend),
        }
    }

    pub fn node(&self) -> &AgentNode {
        &self.node
    }

    /// Only the relevant part of history reaches the model.
    pub fn build_messages(&self, history: &[Message]) -> Vec<Message> {
        self.node
            .messages_for(&relevant_history(history), ANALYSIS_INSTRUCTION)
    }

    /// Always hands over to recommendation once the report is streamed.
    pub fn stream_turn(&self, task: &Task, state: WorkflowState) -> ChunkStream {
        let events = self.node.stream_events(self.build_messages(&task.history));

        relay(events, state.clone(), move |text| {
            info!(chars = text.chars().count(), "Analysis report streamed");
            let next = state.advance_to(Phase::Recommendation)?;
            Ok(vec![StreamChunk::terminal("", Some(next))])
        })
    }
}
