//! Stream chunks: the unit of the streaming response protocol.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::state::WorkflowState;

/// A lazy, finite sequence of chunks making up one turn.
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// One unit of a streamed turn.
///
/// Exactly one chunk per turn has `finished == true`; its `workflow_state`
/// is what the caller persists for the next turn. A terminal chunk with no
/// state marks an abnormal end and must not be persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    pub content: String,
    pub finished: bool,
    pub workflow_state: Option<WorkflowState>,
}

impl StreamChunk {
    /// Non-terminal chunk.
    pub fn partial(content: impl Into<String>, workflow_state: Option<WorkflowState>) -> Self {
        Self {
            content: content.into(),
            finished: false,
            workflow_state,
        }
    }

    /// Terminal chunk carrying the authoritative state.
    pub fn terminal(content: impl Into<String>, workflow_state: Option<WorkflowState>) -> Self {
        Self {
            content: content.into(),
            finished: true,
            workflow_state,
        }
    }

    /// Terminal chunk reporting a failure; carries no state.
    pub fn failure(notice: impl Into<String>) -> Self {
        Self::terminal(notice, None)
    }

    pub fn is_terminal(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Phase;

    #[test]
    fn test_chunk_wire_format() {
        let chunk = StreamChunk::terminal(
            "",
            Some(WorkflowState::new("career-positioning", Phase::Assessment)),
        );
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["finished"], true);
        assert_eq!(json["workflowState"]["phase"], "assessment");

        let failure = serde_json::to_value(StreamChunk::failure("boom")).unwrap();
        assert!(failure["workflowState"].is_null());
    }
}
