//! Coordinator: decides which specialist owns the next turn.

use std::{fmt, sync::Arc};

use careerflow_core::prelude::{CAREER_POSITIONING, Task};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    agent_node::AgentNode,
    agent_types::{AgentConfig, RetryPolicy},
    conversation::CONVERSATION_NODE_ID,
    error::AgentError,
    model_client::ModelBackend,
    parsing::first_object_as,
};

pub const COORDINATOR_NODE_ID: &str = "coordinator";

const COORDINATOR_PROMPT: &str = "你是一个任务分配协调员。\
你的职责是判断用户的请求应该交给哪个处理节点，\
并且只以JSON格式回答，不要输出其他内容。";

/// Career-related vocabulary used when the model's answer is not structured.
const CAREER_KEYWORDS: &[&str] = &[
    "职业规划",
    "职业定位",
    "职业发展",
    "职业",
    "求职",
    "找工作",
    "工作",
    "简历",
    "面试",
    "岗位",
    "就业",
    "转行",
    "career",
    "job",
    "resume",
    "interview",
];

/// Destinations the coordinator can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "conversation")]
    Conversation,
    #[serde(rename = "career-positioning")]
    CareerPositioning,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::Conversation, Route::CareerPositioning];

    pub fn node_id(&self) -> &'static str {
        match self {
            Route::Conversation => CONVERSATION_NODE_ID,
            Route::CareerPositioning => CAREER_POSITIONING,
        }
    }

    pub fn from_node_id(node_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|route| route.node_id() == node_id.trim())
    }

    fn capability(&self) -> &'static str {
        match self {
            Route::Conversation => "通用对话，回答日常问题和闲聊",
            Route::CareerPositioning => "职业定位，通过信息收集、测评、分析为用户推荐合适的职业方向",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_id())
    }
}

/// Routing outcome. `reasoning` is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecision {
    pub node_id: Route,
    pub reasoning: String,
}

impl RouteDecision {
    pub fn new(node_id: Route, reasoning: impl Into<String>) -> Self {
        Self {
            node_id,
            reasoning: reasoning.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(rename = "nodeId", alias = "node_id")]
    node_id: String,
    #[serde(default)]
    reasoning: String,
}

/// Routing agent with retry and keyword fallback.
#[derive(Debug, Clone)]
pub struct CoordinatorAgent {
    node: AgentNode,
    retry: RetryPolicy,
}

impl CoordinatorAgent {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self::with_retry(backend, RetryPolicy::default())
    }

    pub fn with_retry(backend: Arc<dyn ModelBackend>, retry: RetryPolicy) -> Self {
        let config = AgentConfig::new(COORDINATOR_NODE_ID, "根据用户请求选择处理节点")
            .with_system_prompt(COORDINATOR_PROMPT);
        Self {
            node: AgentNode::new(config, backend),
            retry,
        }
    }

    pub fn node(&self) -> &AgentNode {
        &self.node
    }

    /// Pick the route for `task`. Never fails: every query ends up routed.
    pub async fn route(&self, task: &Task) -> RouteDecision {
        if let Some(state) = &task.workflow_state
            && state.is_active_career_positioning()
        {
            info!(phase = %state.phase, "Continuing in-progress career-positioning workflow");
            return RouteDecision::new(
                Route::CareerPositioning,
                "career-positioning workflow in progress",
            );
        }

        let routing_task = self.routing_task(task);
        let mut last_error: Option<AgentError> = None;

        for attempt in 1..=self.retry.max_attempts {
            match self.node.execute(&routing_task).await {
                Ok(response) => {
                    let decision = interpret_response(&response);
                    info!(attempt, route = %decision.node_id, "Routed query");
                    return decision;
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempt, error = %err, "Routing attempt failed");
                    last_error = Some(err);
                    if attempt < self.retry.max_attempts {
                        sleep(self.retry.delay_after(attempt)).await;
                    }
                }
                Err(err) => {
                    last_error = Some(err);
                    break;
                }
            }
        }

        let cause = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        error!(error = %cause, "Routing failed, defaulting to conversation");
        RouteDecision::new(
            Route::Conversation,
            format!("routing failed, defaulted to conversation: {cause}"),
        )
    }

    fn routing_task(&self, task: &Task) -> Task {
        let menu = Route::ALL
            .iter()
            .map(|route| format!("- {}：{}", route.node_id(), route.capability()))
            .collect::<Vec<_>>()
            .join("\n");

        let query = format!(
            "用户消息：{}\n\n可选的处理节点：\n{}\n\n\
             请只返回JSON：{{\"nodeId\": \"<节点ID>\", \"reasoning\": \"<简要理由>\"}}",
            task.query, menu
        );

        Task::new(query).with_history(task.history.clone())
    }
}

/// Structured parse first, then keyword matching, then conversation.
pub fn interpret_response(response: &str) -> RouteDecision {
    if let Some(raw) = first_object_as::<RawDecision>(response) {
        if let Some(route) = Route::from_node_id(&raw.node_id) {
            return RouteDecision::new(route, raw.reasoning);
        }
        warn!(node_id = %raw.node_id, "Coordinator named an unknown node");
    }

    warn!("No usable routing decision, falling back to keyword matching");
    let lowered = response.to_lowercase();
    match CAREER_KEYWORDS
        .iter()
        .find(|keyword| lowered.contains(*keyword))
    {
        Some(keyword) => RouteDecision::new(
            Route::CareerPositioning,
            format!("keyword match: {keyword}"),
        ),
        None => RouteDecision::new(Route::Conversation, "no career keywords, default route"),
    }
}
