//! Information-collection specialist.

use std::sync::{Arc, LazyLock};

use careerflow_core::prelude::{ChunkStream, Phase, StreamChunk, Task, WorkflowState};
use regex::Regex;
use tracing::info;

use super::relay;
use crate::{agent_node::AgentNode, agent_types::AgentConfig, model_client::ModelBackend};

pub const INFO_COLLECTION_NODE_ID: &str = "info-collection";

/// Phrase the model emits once it has gathered enough background.
// TODO: replace sentinel matching with a structured completion flag once the
// prompt returns JSON for this phase.
pub const INFO_COLLECTION_COMPLETE: &str = "信息收集完成";

// Tolerates whitespace the model sometimes puts between the words.
static COMPLETION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"信息\s*收集\s*完成").expect("completion pattern is valid")
});

/// Whether `text` carries the completion sentinel.
pub fn signals_completion(text: &str) -> bool {
    COMPLETION_PATTERN.is_match(text)
}

const TRANSITION_NOTICE: &str = "\n\n接下来将进入职业测评环节，共 15 道选择题。请回复任意内容开始答题。";

const INFO_COLLECTION_PROMPT: &str = "你是一名资深的职业规划顾问，正在为用户做职业定位前的信息收集。\
请通过友好的对话逐步了解用户的以下信息：教育背景与专业、工作或实习经历、技能特长、兴趣爱好、性格特点、职业期望。\
每次只问一到两个问题，不要一次性罗列所有问题。\
当以上信息已经足够清晰时，请先简要总结用户的情况，然后在回复末尾单独输出一行：信息收集完成";

#[derive(Debug, Clone)]
pub struct InfoCollectionAgent {
    node: AgentNode,
}

impl InfoCollectionAgent {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        let config = AgentConfig::new(INFO_COLLECTION_NODE_ID, "信息收集：了解用户背景")
            .with_system_prompt(INFO_COLLECTION_PROMPT);
        Self {
            node: AgentNode::new(config, backend),
        }
    }

    pub fn node(&self) -> &AgentNode {
        &self.node
    }

    /// Streams the model's reply; moves to assessment when the reply
    /// contains [`INFO_COLLECTION_COMPLETE`].
    pub fn stream_turn(&self, task: &Task, state: WorkflowState) -> ChunkStream {
        let events = self.node.stream_events(self.node.build_messages(task));
        let partial_state = state.clone();

        relay(events, partial_state, move |text| {
            if !signals_completion(&text) {
                return Ok(vec![StreamChunk::terminal("", Some(state))]);
            }

            let next = state.advance_to(Phase::Assessment)?;
            info!(from = %state.phase, "Information collection complete");
            Ok(vec![StreamChunk::terminal(TRANSITION_NOTICE, Some(next))])
        })
    }
}
