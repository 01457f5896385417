//! Agent node: a role with a system prompt that answers a task, either in
//! one shot or as a stream of chunks.

use std::sync::Arc;

use careerflow_core::prelude::{ChunkStream, Message, StreamChunk, Task};
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::{
    agent_types::AgentConfig,
    error::{AgentError, Result},
    model_client::{ModelBackend, TextStream},
};

/// Low-level events of one streamed model call.
///
/// A stream of events always ends with exactly one `Completed` or `Failed`.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// A text fragment as it arrived from the backend
    Fragment(String),
    /// The call finished; carries the full accumulated text
    Completed(String),
    /// The call failed, possibly after some fragments
    Failed(AgentError),
}

/// Human-readable notice used in place of content when a turn fails.
pub fn failure_notice(err: &AgentError) -> String {
    format!(
        "抱歉，处理您的请求时出现问题（{}），请稍后重试。",
        err.category()
    )
}

/// AI agent node wrapping a model backend with a fixed role.
///
/// Stateless across invocations apart from its configuration.
#[derive(Clone)]
pub struct AgentNode {
    config: AgentConfig,
    backend: Arc<dyn ModelBackend>,
}

impl std::fmt::Debug for AgentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentNode")
            .field("node_id", &self.config.node_id)
            .field("description", &self.config.description)
            .finish()
    }
}

impl AgentNode {
    /// Create a new agent node
    pub fn new(config: AgentConfig, backend: Arc<dyn ModelBackend>) -> Self {
        Self { config, backend }
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// System prompt, then `history`, then `query` as the final user message.
    pub fn messages_for(&self, history: &[Message], query: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.config.system_prompt.clone()));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(query));
        messages
    }

    pub fn build_messages(&self, task: &Task) -> Vec<Message> {
        self.messages_for(&task.history, &task.query)
    }

    /// One-shot completion for the task.
    pub async fn execute(&self, task: &Task) -> Result<String> {
        self.complete(&self.build_messages(task)).await
    }

    /// One-shot completion for pre-built messages.
    pub async fn complete(&self, messages: &[Message]) -> Result<String> {
        info!(node_id = %self.config.node_id, "Executing completion");
        self.backend.complete(messages).await.map_err(|err| {
            warn!(node_id = %self.config.node_id, error = %err, "Completion failed");
            err.in_node(&self.config.node_id)
        })
    }

    /// Stream a call as [`NodeEvent`]s. Nothing happens until polled.
    pub fn stream_events(&self, messages: Vec<Message>) -> BoxStream<'static, NodeEvent> {
        let pump = EventPump {
            backend: Arc::clone(&self.backend),
            node_id: self.config.node_id.clone(),
            messages,
            fragments: None,
            accumulated: String::new(),
            done: false,
        };
        stream::unfold(pump, EventPump::next_event).boxed()
    }

    /// Default streaming behavior: one chunk per fragment carrying the task's
    /// workflow state, then an empty terminal chunk with the same state.
    /// Backend failures become a single terminal failure chunk.
    pub fn stream_execute(&self, task: &Task) -> ChunkStream {
        let state = task.workflow_state.clone();
        let node_id = self.config.node_id.clone();

        self.stream_events(self.build_messages(task))
            .map(move |event| match event {
                NodeEvent::Fragment(text) => StreamChunk::partial(text, state.clone()),
                NodeEvent::Completed(_) => StreamChunk::terminal("", state.clone()),
                NodeEvent::Failed(err) => {
                    error!(node_id = %node_id, error = %err, "Streaming failed");
                    StreamChunk::failure(failure_notice(&err))
                }
            })
            .boxed()
    }
}

struct EventPump {
    backend: Arc<dyn ModelBackend>,
    node_id: String,
    messages: Vec<Message>,
    fragments: Option<TextStream>,
    accumulated: String,
    done: bool,
}

impl EventPump {
    async fn next_event(mut self) -> Option<(NodeEvent, Self)> {
        if self.done {
            return None;
        }

        if self.fragments.is_none() {
            debug!(node_id = %self.node_id, "Opening model stream");
            match self.backend.stream_complete(&self.messages).await {
                Ok(fragments) => self.fragments = Some(fragments),
                Err(err) => {
                    self.done = true;
                    return Some((NodeEvent::Failed(err.in_node(&self.node_id)), self));
                }
            }
        }

        let next = match self.fragments.as_mut() {
            Some(fragments) => fragments.next().await,
            None => None,
        };

        let event = match next {
            Some(Ok(fragment)) => {
                self.accumulated.push_str(&fragment);
                NodeEvent::Fragment(fragment)
            }
            Some(Err(err)) => {
                self.finish();
                NodeEvent::Failed(err.in_node(&self.node_id))
            }
            None => {
                self.finish();
                NodeEvent::Completed(std::mem::take(&mut self.accumulated))
            }
        };
        Some((event, self))
    }

    fn finish(&mut self) {
        self.done = true;
        self.fragments = None;
    }
}
