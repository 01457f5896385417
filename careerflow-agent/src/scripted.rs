//! In-memory model backend that replays scripted replies.
//!
//! Useful for tests and offline demos: every call pops the next [`Reply`]
//! and the messages each call received are recorded for inspection.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use careerflow_core::prelude::Message;
use futures::stream::{self, StreamExt};

use crate::{
    error::{AgentError, Result},
    model_client::{ModelBackend, TextStream},
};

/// One scripted backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Full text; streamed as a single fragment.
    Text(String),
    /// Streamed fragment by fragment; `complete` returns them joined.
    Fragments(Vec<String>),
    /// The call fails before any output.
    Fail(String),
    /// Some fragments arrive, then the stream fails.
    FailMidStream(Vec<String>, String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fragments(fragments.into_iter().map(Into::into).collect())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// Backend replaying a fixed script of replies in order.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Messages received by each call so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    fn next_reply(&self, messages: &[Message]) -> Result<Reply> {
        self.calls
            .lock()
            .map_err(|_| AgentError::internal("scripted backend poisoned"))?
            .push(messages.to_vec());
        self.replies
            .lock()
            .map_err(|_| AgentError::internal("scripted backend poisoned"))?
            .pop_front()
            .ok_or_else(|| AgentError::backend("scripted backend has no replies left"))
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        match self.next_reply(messages)? {
            Reply::Text(text) => Ok(text),
            Reply::Fragments(fragments) => Ok(fragments.concat()),
            Reply::Fail(message) | Reply::FailMidStream(_, message) => {
                Err(AgentError::backend(message))
            }
        }
    }

    async fn stream_complete(&self, messages: &[Message]) -> Result<TextStream> {
        let fragments: Vec<Result<String>> = match self.next_reply(messages)? {
            Reply::Text(text) => vec![Ok(text)],
            Reply::Fragments(fragments) => fragments.into_iter().map(Ok).collect(),
            Reply::Fail(message) => return Err(AgentError::backend(message)),
            Reply::FailMidStream(fragments, message) => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(AgentError::streaming(message))))
                .collect(),
        };
        Ok(stream::iter(fragments).boxed())
    }
}
