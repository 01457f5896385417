//! Recommendation specialist with a user feedback loop.

use std::sync::{Arc, LazyLock};

use careerflow_core::prelude::{
    ChunkStream, Message, Phase, Role, StreamChunk, Task, WorkflowState,
};
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{history::relevant_history, relay};
use crate::{
    agent_node::AgentNode,
    agent_types::AgentConfig,
    error::{AgentError, Result},
    model_client::ModelBackend,
    parsing::extract_json_objects,
};

pub const RECOMMENDATION_NODE_ID: &str = "recommendation";

// A negation shortly before any positive marker, or an explicit request for
// another role. Checked before the positive markers it overlaps with.
static NEGATIVE_FEEDBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:不|没)[^，,。.！!？?\s]{0,2}?(?:喜欢|满意|感兴趣|兴趣|合适|适合)|换一个|换个")
        .expect("negative feedback pattern is valid")
});
const POSITIVE_MARKERS: &[&str] = &["喜欢", "满意", "感兴趣", "合适"];

const RECOMMENDATION_PROMPT: &str = "你是一名职业推荐专家。\
请根据用户的背景信息、测评结果和职业分析，每次只推荐一个最适合的职位。\
推荐内容必须包含一个JSON对象，格式为：\
{\"job_title\": \"职位名称\", \"job_description\": \"职位描述以及推荐理由\"}。\
JSON之外可以附上简短的说明。";

const NEGATIVE_ACK: &str = "好的，明白这个职位不太适合您，我再为您推荐另一个方向。\n\n";
const COMPLETION_MESSAGE: &str = "很高兴这个推荐符合您的期望！本次职业定位已经完成，祝您求职顺利。";
const FALLBACK_LEAD: &str = "\n\n以下是为您补充的推荐：\n";

const FALLBACK_RECOMMENDATIONS: &[(&str, &str)] = &[
    (
        "产品经理",
        "负责需求调研、产品规划与跨团队协作，适合沟通能力强、兼顾逻辑与用户视角的人。",
    ),
    (
        "数据分析师",
        "通过数据挖掘和统计分析支撑业务决策，适合对数字敏感、喜欢寻找规律的人。",
    ),
    (
        "用户体验设计师",
        "研究用户行为并设计易用的交互方案，适合兼具同理心与创造力的人。",
    ),
    (
        "项目经理",
        "统筹项目进度、资源与风险，确保目标按时交付，适合组织协调能力强的人。",
    ),
    (
        "市场营销专员",
        "策划推广活动并分析市场反馈，适合善于表达、对趋势敏感的人。",
    ),
];

/// How the user reacted to the previous recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Negative,
    Positive,
    Neutral,
}

pub fn classify_feedback(query: &str) -> Feedback {
    if NEGATIVE_FEEDBACK.is_match(query) {
        Feedback::Negative
    } else if POSITIVE_MARKERS.iter().any(|marker| query.contains(marker)) {
        Feedback::Positive
    } else {
        Feedback::Neutral
    }
}

/// Structured recommendation the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecommendation {
    pub job_title: String,
    pub job_description: String,
}

impl JobRecommendation {
    pub fn is_valid(&self) -> bool {
        !self.job_title.trim().is_empty() && !self.job_description.trim().is_empty()
    }
}

/// First well-formed recommendation embedded in `text`.
pub fn extract_recommendation(text: &str) -> Option<JobRecommendation> {
    extract_json_objects(text)
        .into_iter()
        .filter_map(|value| serde_json::from_value::<JobRecommendation>(value).ok())
        .find(JobRecommendation::is_valid)
}

/// Rotating fallback, indexed by `progress` modulo the list length.
pub fn fallback_recommendation(progress: u32) -> JobRecommendation {
    let (title, description) =
        FALLBACK_RECOMMENDATIONS[progress as usize % FALLBACK_RECOMMENDATIONS.len()];
    JobRecommendation {
        job_title: title.to_string(),
        job_description: description.to_string(),
    }
}

/// Titles already recommended by the assistant in `history`.
pub fn recommended_titles(history: &[Message]) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for message in history.iter().filter(|m| m.role == Role::Assistant) {
        for value in extract_json_objects(&message.content) {
            if let Some(title) = value.get("job_title").and_then(|v| v.as_str()) {
                let title = title.trim();
                if !title.is_empty() && !titles.iter().any(|t| t == title) {
                    titles.push(title.to_string());
                }
            }
        }
    }
    titles
}

fn render_fallback(recommendation: &JobRecommendation) -> Result<String> {
    let body = serde_json::to_string_pretty(recommendation)?;
    Ok(format!("{FALLBACK_LEAD}```json\n{body}\n```"))
}

#[derive(Debug, Clone)]
pub struct RecommendationAgent {
    node: AgentNode,
}

impl RecommendationAgent {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        let config = AgentConfig::new(RECOMMENDATION_NODE_ID, "职业推荐：逐个推荐职位并收集反馈")
            .with_system_prompt(RECOMMENDATION_PROMPT);
        Self {
            node: AgentNode::new(config, backend),
        }
    }

    pub fn node(&self) -> &AgentNode {
        &self.node
    }

    pub fn build_messages(&self, task: &Task) -> Vec<Message> {
        let previous = recommended_titles(&task.history);
        let avoid = if previous.is_empty() {
            String::new()
        } else {
            format!(
                "\n不要重复推荐以下已经推荐过的职位：{}。",
                previous.join("、")
            )
        };
        let instruction = format!(
            "用户最新的回复：{}\n请推荐一个新的职位。{avoid}",
            task.query
        );
        self.node
            .messages_for(&relevant_history(&task.history), &instruction)
    }

    pub fn stream_turn(&self, task: &Task, state: WorkflowState) -> Result<ChunkStream> {
        let feedback = if state.progress > 0 {
            classify_feedback(&task.query)
        } else {
            Feedback::Neutral
        };

        if feedback == Feedback::Positive {
            info!(shown = state.progress, "User accepted a recommendation");
            let done = state.advance_to(Phase::Completed)?;
            let chunk = StreamChunk::terminal(COMPLETION_MESSAGE, Some(done));
            return Ok(stream::once(async move { chunk }).boxed());
        }

        let generated = self.generate(task, state.clone());
        if feedback == Feedback::Negative {
            let ack = StreamChunk::partial(NEGATIVE_ACK, Some(state));
            return Ok(stream::once(async move { ack }).chain(generated).boxed());
        }
        Ok(generated)
    }

    fn generate(&self, task: &Task, state: WorkflowState) -> ChunkStream {
        let events = self.node.stream_events(self.build_messages(task));

        relay(events, state.clone(), move |text| {
            let mut chunks = Vec::with_capacity(2);
            if extract_recommendation(&text).is_none() {
                let fallback = fallback_recommendation(state.progress);
                let err = AgentError::malformed_output("no job_title/job_description object");
                warn!(
                    progress = state.progress,
                    error = %err,
                    job_title = %fallback.job_title,
                    "Using fallback recommendation"
                );
                chunks.push(StreamChunk::partial(
                    render_fallback(&fallback)?,
                    Some(state.clone()),
                ));
            }
            chunks.push(StreamChunk::terminal("", Some(state.increment_progress())));
            Ok(chunks)
        })
    }
}
