//! Wire-level normalization of chunk streams.
//!
//! Every turn ends with exactly one terminal chunk, and that chunk is the
//! last one. The first chunk carries the caller's initial workflow state
//! unless it already names one. Two wrappers enforce this:
//!
//! - [`buffered`] collects the whole stream first, so the last chunk is
//!   known for certain.
//! - [`pass_through`] forwards chunks as they arrive and ends at the first
//!   terminal chunk. A failure chunk emitted mid-flight is therefore the
//!   terminal chunk.
//!
//! A raw chunk that is already terminal and has no state is a failure
//! notice; its missing state is kept so the caller does not persist it.

use careerflow_core::prelude::{ChunkStream, StreamChunk, WorkflowState};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::Result;

const FAILURE_FRAME: &str = "data: {\"content\":\"\",\"finished\":true,\"workflowState\":null}\n\n";

fn apply_initial(chunk: &mut StreamChunk, initial: Option<WorkflowState>) {
    let failure = chunk.finished && chunk.workflow_state.is_none();
    if !failure && chunk.workflow_state.is_none() {
        chunk.workflow_state = initial;
    }
}

/// Normalize a fully collected turn.
pub fn normalize_chunks(
    mut chunks: Vec<StreamChunk>,
    initial: Option<WorkflowState>,
) -> Vec<StreamChunk> {
    let Some(first) = chunks.first_mut() else {
        return vec![StreamChunk::terminal("", initial)];
    };
    apply_initial(first, initial);

    let last = chunks.len() - 1;
    for (index, chunk) in chunks.iter_mut().enumerate() {
        chunk.finished = index == last;
    }
    chunks
}

/// Buffer the whole stream, then emit it normalized.
pub fn buffered(chunks: ChunkStream, initial: Option<WorkflowState>) -> ChunkStream {
    stream::once(async move {
        let collected: Vec<StreamChunk> = chunks.collect().await;
        stream::iter(normalize_chunks(collected, initial))
    })
    .flatten()
    .boxed()
}

/// Normalize without buffering.
///
/// Chunks after the first terminal one are dropped. If the inner stream
/// ends without a terminal chunk, an empty one carrying the latest state
/// seen is appended.
pub fn pass_through(chunks: ChunkStream, initial: Option<WorkflowState>) -> ChunkStream {
    let relay = PassThrough {
        chunks,
        initial: Some(initial),
        last_state: None,
        done: false,
    };
    stream::unfold(relay, PassThrough::next_chunk).boxed()
}

struct PassThrough {
    chunks: ChunkStream,
    /// `Some` until the first chunk has gone out.
    initial: Option<Option<WorkflowState>>,
    last_state: Option<WorkflowState>,
    done: bool,
}

impl PassThrough {
    async fn next_chunk(mut self) -> Option<(StreamChunk, Self)> {
        if self.done {
            return None;
        }

        let chunk = match self.chunks.next().await {
            Some(mut chunk) => {
                if let Some(initial) = self.initial.take() {
                    apply_initial(&mut chunk, initial);
                }
                if chunk.workflow_state.is_some() {
                    self.last_state = chunk.workflow_state.clone();
                }
                self.done = chunk.finished;
                chunk
            }
            None => {
                self.done = true;
                match self.initial.take() {
                    Some(initial) => StreamChunk::terminal("", initial),
                    None => {
                        warn!("Chunk stream ended without a terminal chunk");
                        StreamChunk::terminal("", self.last_state.take())
                    }
                }
            }
        };
        Some((chunk, self))
    }
}

/// One Server-Sent-Events frame: `data: <json>\n\n`.
pub fn sse_frame(chunk: &StreamChunk) -> Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(chunk)?))
}

/// [`pass_through`] rendered as SSE frames.
pub fn sse_stream(
    chunks: ChunkStream,
    initial: Option<WorkflowState>,
) -> BoxStream<'static, String> {
    pass_through(chunks, initial)
        .map(|chunk| {
            sse_frame(&chunk).unwrap_or_else(|err| {
                error!(error = %err, "Failed to encode chunk");
                FAILURE_FRAME.to_string()
            })
        })
        .boxed()
}

/// What a caller keeps from a finished turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// All chunk contents concatenated, for history storage.
    pub content: String,
    /// State from the terminal chunk; `None` means do not persist.
    pub final_state: Option<WorkflowState>,
    pub finished: bool,
}

/// Drain a turn, concatenating content and capturing the terminal state.
pub async fn collect_turn(chunks: ChunkStream) -> TurnOutcome {
    chunks
        .fold(TurnOutcome::default(), |mut outcome, chunk| async move {
            if !outcome.finished {
                outcome.content.push_str(&chunk.content);
                if chunk.finished {
                    outcome.finished = true;
                    outcome.final_state = chunk.workflow_state;
                }
            }
            outcome
        })
        .await
}

#[cfg(test)]
mod tests {
    use careerflow_core::prelude::{CAREER_POSITIONING, Phase};
    use pretty_assertions::assert_eq;

    use super::*;

    fn state(phase: Phase, progress: u32) -> WorkflowState {
        WorkflowState::new(CAREER_POSITIONING, phase).with_progress(progress)
    }

    fn raw(chunks: Vec<StreamChunk>) -> ChunkStream {
        stream::iter(chunks).boxed()
    }

    fn assert_single_trailing_terminal(chunks: &[StreamChunk]) {
        assert_eq!(chunks.iter().filter(|c| c.finished).count(), 1);
        assert!(chunks.last().is_some_and(|c| c.finished));
    }

    #[test]
    fn test_empty_turn_yields_initial_state() {
        let initial = state(Phase::Assessment, 2);
        assert_eq!(
            normalize_chunks(Vec::new(), Some(initial.clone())),
            vec![StreamChunk::terminal("", Some(initial))]
        );
    }

    #[test]
    fn test_first_chunk_defaults_and_last_is_terminal() {
        let initial = state(Phase::InfoCollection, 0);
        let chunks = vec![
            StreamChunk::partial("a", None),
            StreamChunk::terminal("b", None),
            StreamChunk::partial("c", None),
        ];

        let normalized = normalize_chunks(chunks, Some(initial.clone()));

        assert_single_trailing_terminal(&normalized);
        assert_eq!(normalized[0].workflow_state, Some(initial));
        assert_eq!(normalized[1].workflow_state, None);
        assert_eq!(normalized[2].content, "c");
    }

    #[test]
    fn test_explicit_first_state_is_kept() {
        let own = state(Phase::Analysis, 0);
        let normalized = normalize_chunks(
            vec![StreamChunk::partial("x", Some(own.clone()))],
            Some(state(Phase::Assessment, 14)),
        );
        assert_eq!(normalized, vec![StreamChunk::terminal("x", Some(own))]);
    }

    #[test]
    fn test_failure_chunk_keeps_null_state() {
        let normalized = normalize_chunks(
            vec![StreamChunk::failure("出错了")],
            Some(state(Phase::Analysis, 0)),
        );
        assert_eq!(normalized, vec![StreamChunk::failure("出错了")]);
    }

    #[test]
    fn test_buffered_matches_normalize() {
        let initial = state(Phase::Recommendation, 1);
        let chunks = vec![StreamChunk::partial("a", None), StreamChunk::partial("b", None)];

        let emitted: Vec<StreamChunk> =
            tokio_test::block_on(buffered(raw(chunks.clone()), Some(initial.clone())).collect());

        assert_eq!(emitted, normalize_chunks(chunks, Some(initial)));
    }

    #[tokio::test]
    async fn test_pass_through_empty_stream() {
        let initial = state(Phase::Start, 0);
        let emitted: Vec<StreamChunk> = pass_through(raw(Vec::new()), Some(initial.clone()))
            .collect()
            .await;
        assert_eq!(emitted, vec![StreamChunk::terminal("", Some(initial))]);
    }

    #[tokio::test]
    async fn test_pass_through_stops_at_first_terminal() {
        let emitted: Vec<StreamChunk> = pass_through(
            raw(vec![
                StreamChunk::partial("部分", None),
                StreamChunk::failure("中断"),
                StreamChunk::partial("迟到", None),
            ]),
            Some(state(Phase::Analysis, 0)),
        )
        .collect()
        .await;

        assert_eq!(emitted.len(), 2);
        assert_single_trailing_terminal(&emitted);
        assert_eq!(emitted[0].workflow_state, Some(state(Phase::Analysis, 0)));
        assert_eq!(emitted[1].workflow_state, None);
    }

    #[tokio::test]
    async fn test_pass_through_closes_open_stream_with_latest_state() {
        let later = state(Phase::Recommendation, 0);
        let emitted: Vec<StreamChunk> = pass_through(
            raw(vec![
                StreamChunk::partial("a", None),
                StreamChunk::partial("b", Some(later.clone())),
            ]),
            Some(state(Phase::Analysis, 0)),
        )
        .collect()
        .await;

        assert_eq!(emitted.len(), 3);
        assert_single_trailing_terminal(&emitted);
        assert_eq!(emitted[2], StreamChunk::terminal("", Some(later)));
    }

    #[test]
    fn test_sse_frame_format() {
        let chunk = StreamChunk::terminal("好", Some(state(Phase::Assessment, 4)));
        assert_eq!(
            sse_frame(&chunk).unwrap(),
            "data: {\"content\":\"好\",\"finished\":true,\"workflowState\":\
             {\"workflowId\":\"career-positioning\",\"phase\":\"assessment\",\"progress\":4}}\n\n"
        );
    }

    #[tokio::test]
    async fn test_sse_stream_frames_every_chunk() {
        let frames: Vec<String> = sse_stream(raw(vec![StreamChunk::partial("a", None)]), None)
            .collect()
            .await;

        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.starts_with("data: {") && f.ends_with("\n\n")));
        assert!(frames[0].contains("\"finished\":false"));
        assert!(frames[1].contains("\"finished\":true"));
    }

    #[tokio::test]
    async fn test_collect_turn() {
        let next = state(Phase::Assessment, 0);
        let outcome = collect_turn(raw(vec![
            StreamChunk::partial("信息", None),
            StreamChunk::terminal("收集完成", Some(next.clone())),
        ]))
        .await;

        assert_eq!(
            outcome,
            TurnOutcome {
                content: "信息收集完成".to_string(),
                final_state: Some(next),
                finished: true,
            }
        );
    }
}
