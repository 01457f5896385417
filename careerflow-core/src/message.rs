//! Conversation messages and per-turn tasks.

use serde::{Deserialize, Serialize};

use crate::state::WorkflowState;

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Input for a single agent invocation.
///
/// Built per turn by the caller; never persisted here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub query: String,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub workflow_state: Option<WorkflowState>,
}

impl Task {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            workflow_state: None,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_workflow_state(mut self, state: Option<WorkflowState>) -> Self {
        self.workflow_state = state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new("hello")
            .with_history(vec![Message::user("earlier")])
            .with_workflow_state(Some(WorkflowState::career_positioning()));

        assert_eq!(task.query, "hello");
        assert_eq!(task.history.len(), 1);
        assert!(task.workflow_state.is_some());
    }
}
