//! Career-positioning workflow: a phase state machine over four specialists.
//!
//! ```text
//! start / info_collection ──sentinel──▶ assessment ──15 answers──▶ analysis
//!        ──always──▶ recommendation ──positive feedback──▶ completed
//! ```
//!
//! Each turn reads the incoming [`WorkflowState`], dispatches to the
//! specialist owning its phase and reports the next state in the terminal
//! chunk. Failures anywhere in a phase end the turn with a terminal chunk
//! carrying no state.

pub mod analysis;
pub mod assessment;
pub mod history;
pub mod info_collection;
pub mod questions;
pub mod recommendation;

use std::sync::Arc;

use careerflow_core::prelude::{
    ChunkStream, FlowError, FlowState, Phase, StreamChunk, Task, WorkflowState,
};
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{error, info};

use self::{
    analysis::AnalysisAgent,
    assessment::AssessmentAgent,
    history::{is_choice, question_pending},
    info_collection::InfoCollectionAgent,
    questions::QUESTION_COUNT,
    recommendation::RecommendationAgent,
};
use crate::{
    agent_node::{NodeEvent, failure_notice},
    error::Result,
    model_client::ModelBackend,
};

const ASSESSMENT_COMPLETE_NOTICE: &str =
    "测评题已全部完成！请回复任意内容，我将为您生成职业分析报告。";
const WORKFLOW_COMPLETED_NOTICE: &str = "本次职业定位流程已经完成。如果想重新开始，请告诉我。";

fn single(chunk: StreamChunk) -> ChunkStream {
    stream::once(async move { chunk }).boxed()
}

/// Relay model fragments as partial chunks carrying `state`, then let
/// `finish` produce the closing chunks from the full text.
pub(crate) fn relay<F>(
    events: BoxStream<'static, NodeEvent>,
    state: WorkflowState,
    finish: F,
) -> ChunkStream
where
    F: FnOnce(String) -> Result<Vec<StreamChunk>> + Send + 'static,
{
    let mut finish = Some(finish);
    events
        .flat_map(move |event| {
            let chunks = match event {
                NodeEvent::Fragment(text) => vec![StreamChunk::partial(text, Some(state.clone()))],
                NodeEvent::Completed(text) => match finish.take().map(|finish| finish(text)) {
                    Some(Ok(chunks)) => chunks,
                    Some(Err(err)) => {
                        error!(error = %err, "Phase completion failed");
                        vec![StreamChunk::failure(failure_notice(&err))]
                    }
                    None => Vec::new(),
                },
                NodeEvent::Failed(err) => {
                    error!(error = %err, phase = %state.phase, "Specialist call failed");
                    vec![StreamChunk::failure(failure_notice(&err))]
                }
            };
            stream::iter(chunks)
        })
        .boxed()
}

/// The specialist owning a phase.
#[derive(Debug, Clone, Copy)]
pub enum Specialist<'a> {
    InfoCollection(&'a InfoCollectionAgent),
    Assessment(&'a AssessmentAgent),
    Analysis(&'a AnalysisAgent),
    Recommendation(&'a RecommendationAgent),
}

impl Specialist<'_> {
    pub fn node_id(&self) -> &str {
        match self {
            Specialist::InfoCollection(agent) => agent.node().node_id(),
            Specialist::Assessment(agent) => &agent.config().node_id,
            Specialist::Analysis(agent) => agent.node().node_id(),
            Specialist::Recommendation(agent) => agent.node().node_id(),
        }
    }

    fn stream_turn(&self, task: &Task, state: WorkflowState) -> Result<ChunkStream> {
        match self {
            Specialist::InfoCollection(agent) => Ok(agent.stream_turn(task, state)),
            Specialist::Assessment(agent) => agent.stream_turn(state),
            Specialist::Analysis(agent) => Ok(agent.stream_turn(task, state)),
            Specialist::Recommendation(agent) => agent.stream_turn(task, state),
        }
    }
}

/// Career-positioning workflow owning its four specialists.
#[derive(Debug, Clone)]
pub struct CareerWorkflow {
    info_collection: InfoCollectionAgent,
    assessment: AssessmentAgent,
    analysis: AnalysisAgent,
    recommendation: RecommendationAgent,
}

impl CareerWorkflow {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            info_collection: InfoCollectionAgent::new(Arc::clone(&backend)),
            assessment: AssessmentAgent::new(),
            analysis: AnalysisAgent::new(Arc::clone(&backend)),
            recommendation: RecommendationAgent::new(backend),
        }
    }

    /// `None` once the workflow has completed.
    pub fn specialist_for(&self, phase: Phase) -> Option<Specialist<'_>> {
        match phase {
            Phase::Start | Phase::InfoCollection => {
                Some(Specialist::InfoCollection(&self.info_collection))
            }
            Phase::Assessment => Some(Specialist::Assessment(&self.assessment)),
            Phase::Analysis => Some(Specialist::Analysis(&self.analysis)),
            Phase::Recommendation => Some(Specialist::Recommendation(&self.recommendation)),
            Phase::Completed => None,
        }
    }

    /// Run one turn. A task without state starts a fresh workflow.
    pub fn stream_execute(&self, task: &Task) -> ChunkStream {
        match self.dispatch(task) {
            Ok(chunks) => chunks,
            Err(err) => {
                error!(error = %err, category = err.category(), "Workflow turn aborted");
                single(StreamChunk::failure(failure_notice(&err)))
            }
        }
    }

    fn dispatch(&self, task: &Task) -> Result<ChunkStream> {
        let state = task
            .workflow_state
            .clone()
            .unwrap_or_else(WorkflowState::career_positioning);
        if !state.is_career_positioning() {
            return Err(FlowError::unknown_workflow(state.workflow_id).into());
        }

        let state = match state.phase {
            Phase::Assessment => match self.record_answer(task, state)? {
                AnswerOutcome::Ask(state) => state,
                AnswerOutcome::Finished(next) => {
                    info!("Assessment finished, moving to analysis");
                    return Ok(single(StreamChunk::terminal(
                        ASSESSMENT_COMPLETE_NOTICE,
                        Some(next),
                    )));
                }
            },
            _ => state,
        };

        let Some(specialist) = self.specialist_for(state.phase) else {
            debug_assert!(state.phase.is_terminal());
            return Ok(single(StreamChunk::terminal(
                WORKFLOW_COMPLETED_NOTICE,
                Some(state),
            )));
        };

        info!(
            phase = %state.phase,
            progress = state.progress,
            specialist = specialist.node_id(),
            "Dispatching workflow turn"
        );
        specialist.stream_turn(task, state)
    }

    /// Count a valid answer to the question on screen, and finish the
    /// assessment once every question is answered.
    fn record_answer(&self, task: &Task, state: WorkflowState) -> Result<AnswerOutcome> {
        let answered =
            is_choice(&task.query) && (state.progress > 0 || question_pending(&task.history));
        let state = if answered {
            state.increment_progress()
        } else {
            state
        };

        if state.progress as usize >= QUESTION_COUNT {
            return Ok(AnswerOutcome::Finished(state.advance_to(Phase::Analysis)?));
        }
        Ok(AnswerOutcome::Ask(state))
    }
}

enum AnswerOutcome {
    Ask(WorkflowState),
    Finished(WorkflowState),
}

#[cfg(test)]
mod tests {
    use careerflow_core::prelude::{CAREER_POSITIONING, Message, Role};
    use pretty_assertions::assert_eq;

    use super::{
        assessment::QUESTION_CARD_MARKER, info_collection::INFO_COLLECTION_COMPLETE,
        questions::QUESTION_BANK, *,
    };
    use crate::scripted::{Reply, ScriptedBackend};

    fn workflow(replies: Vec<Reply>) -> (CareerWorkflow, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new(replies));
        (CareerWorkflow::new(backend.clone()), backend)
    }

    fn state(phase: Phase, progress: u32) -> WorkflowState {
        WorkflowState::new(CAREER_POSITIONING, phase).with_progress(progress)
    }

    async fn run(workflow: &CareerWorkflow, task: Task) -> Vec<StreamChunk> {
        let chunks: Vec<StreamChunk> = workflow.stream_execute(&task).collect().await;
        let terminal = chunks.iter().filter(|c| c.finished).count();
        assert_eq!(terminal, 1, "exactly one terminal chunk");
        assert!(chunks.last().unwrap().finished, "terminal chunk is last");
        chunks
    }

    fn final_state(chunks: &[StreamChunk]) -> Option<WorkflowState> {
        chunks.last().and_then(|c| c.workflow_state.clone())
    }

    fn content(chunks: &[StreamChunk]) -> String {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fresh_task_starts_info_collection() {
        let (wf, backend) = workflow(vec![Reply::fragments(["请问您的", "专业是什么？"])]);

        let chunks = run(&wf, Task::new("我想了解职业规划")).await;

        assert_eq!(content(&chunks), "请问您的专业是什么？");
        assert_eq!(final_state(&chunks), Some(state(Phase::InfoCollection, 0)));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_sentinel_moves_to_assessment() {
        let (wf, _) = workflow(vec![Reply::fragments([
            "总结：您是计算机专业。\n",
            INFO_COLLECTION_COMPLETE,
        ])]);
        let task = Task::new("我擅长编程")
            .with_workflow_state(Some(state(Phase::InfoCollection, 0)));

        let chunks = run(&wf, task).await;

        assert_eq!(final_state(&chunks), Some(state(Phase::Assessment, 0)));
        assert!(
            chunks[..chunks.len() - 1]
                .iter()
                .all(|c| c.workflow_state == Some(state(Phase::InfoCollection, 0)))
        );
    }

    #[tokio::test]
    async fn test_start_phase_is_handled_as_info_collection() {
        let (wf, _) = workflow(vec![Reply::text("您好，请介绍一下自己")]);
        let task = Task::new("开始").with_workflow_state(Some(state(Phase::Start, 0)));

        let chunks = run(&wf, task).await;

        assert_eq!(final_state(&chunks), Some(state(Phase::Start, 0)));
    }

    #[tokio::test]
    async fn test_valid_answer_increments_before_asking() {
        let (wf, backend) = workflow(vec![]);
        let task = Task::new("B").with_workflow_state(Some(state(Phase::Assessment, 3)));

        let chunks = run(&wf, task).await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains(QUESTION_BANK[4].question));
        assert_eq!(final_state(&chunks), Some(state(Phase::Assessment, 4)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_first_answer_counts_only_after_question_shown() {
        let (wf, _) = workflow(vec![]);

        let task = Task::new("A").with_workflow_state(Some(state(Phase::Assessment, 0)));
        let chunks = run(&wf, task).await;
        assert!(chunks[0].content.contains(QUESTION_BANK[0].question));
        assert_eq!(final_state(&chunks), Some(state(Phase::Assessment, 0)));

        let history = vec![Message::user("开始"), Message::assistant(content(&chunks))];
        let task = Task::new("a")
            .with_history(history)
            .with_workflow_state(Some(state(Phase::Assessment, 0)));
        let chunks = run(&wf, task).await;
        assert!(chunks[0].content.contains(QUESTION_BANK[1].question));
        assert_eq!(final_state(&chunks), Some(state(Phase::Assessment, 1)));
    }

    #[tokio::test]
    async fn test_invalid_answer_repeats_question() {
        let (wf, _) = workflow(vec![]);
        let task = Task::new("我不确定").with_workflow_state(Some(state(Phase::Assessment, 5)));

        let chunks = run(&wf, task).await;

        assert!(chunks[0].content.contains(QUESTION_BANK[5].question));
        assert_eq!(final_state(&chunks), Some(state(Phase::Assessment, 5)));
    }

    #[tokio::test]
    async fn test_last_answer_short_circuits_to_analysis() {
        let (wf, backend) = workflow(vec![]);
        let task = Task::new("c").with_workflow_state(Some(state(Phase::Assessment, 14)));

        let chunks = run(&wf, task).await;

        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].content.contains(QUESTION_CARD_MARKER));
        assert_eq!(final_state(&chunks), Some(state(Phase::Analysis, 0)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_beyond_bank_moves_to_analysis() {
        let (wf, _) = workflow(vec![]);
        let task = Task::new("你好").with_workflow_state(Some(state(Phase::Assessment, 20)));

        let chunks = run(&wf, task).await;

        assert_eq!(final_state(&chunks), Some(state(Phase::Analysis, 0)));
    }

    #[tokio::test]
    async fn test_analysis_always_advances_with_filtered_history() {
        let (wf, backend) = workflow(vec![Reply::fragments(["您的优势", "在于逻辑分析。"])]);
        let history = vec![
            Message::user("今天天气不错"),
            Message::user("我的专业是数学"),
            Message::assistant("好的"),
        ];
        let task = Task::new("开始分析")
            .with_history(history)
            .with_workflow_state(Some(state(Phase::Analysis, 0)));

        let chunks = run(&wf, task).await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].workflow_state, Some(state(Phase::Analysis, 0)));
        assert_eq!(final_state(&chunks), Some(state(Phase::Recommendation, 0)));

        let sent = &backend.calls()[0];
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[1], Message::user("我的专业是数学"));
        assert_eq!(sent.len(), 3);
    }

    #[tokio::test]
    async fn test_analysis_failure_yields_null_state() {
        let (wf, _) = workflow(vec![Reply::fail("unavailable")]);
        let task = Task::new("分析").with_workflow_state(Some(state(Phase::Analysis, 0)));

        let chunks = run(&wf, task).await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(final_state(&chunks), None);
    }

    #[tokio::test]
    async fn test_first_recommendation_is_validated() {
        let (wf, _) = workflow(vec![Reply::text(
            r#"{"job_title": "后端工程师", "job_description": "负责服务端开发"}"#,
        )]);
        let task = Task::new("好的").with_workflow_state(Some(state(Phase::Recommendation, 0)));

        let chunks = run(&wf, task).await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(final_state(&chunks), Some(state(Phase::Recommendation, 1)));
    }

    #[tokio::test]
    async fn test_invalid_recommendation_gets_fallback() {
        let (wf, _) = workflow(vec![Reply::text("我觉得您适合做技术。")]);
        let task = Task::new("好的").with_workflow_state(Some(state(Phase::Recommendation, 1)));

        let chunks = run(&wf, task).await;

        let rec = recommendation::extract_recommendation(&content(&chunks)).unwrap();
        assert_eq!(rec, recommendation::fallback_recommendation(1));
        assert_eq!(final_state(&chunks), Some(state(Phase::Recommendation, 2)));
    }

    #[tokio::test]
    async fn test_negative_feedback_continues_recommending() {
        let (wf, backend) = workflow(vec![Reply::text(
            r#"{"job_title": "数据分析师", "job_description": "分析业务数据"}"#,
        )]);
        let history = vec![Message::assistant(
            r#"{"job_title": "产品经理", "job_description": "规划产品"}"#,
        )];
        let task = Task::new("我不喜欢这个职位")
            .with_history(history)
            .with_workflow_state(Some(state(Phase::Recommendation, 2)));

        let chunks = run(&wf, task).await;

        assert!(!chunks[0].finished);
        assert!(content(&chunks).contains("数据分析师"));
        assert_eq!(final_state(&chunks), Some(state(Phase::Recommendation, 3)));
        let calls = backend.calls();
        let instruction = &calls[0].last().unwrap().content;
        assert!(instruction.contains("产品经理"));
    }

    #[tokio::test]
    async fn test_positive_feedback_completes_workflow() {
        let (wf, backend) = workflow(vec![]);
        let task =
            Task::new("我很喜欢").with_workflow_state(Some(state(Phase::Recommendation, 2)));

        let chunks = run(&wf, task).await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(final_state(&chunks), Some(state(Phase::Completed, 0)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_completed_workflow_is_informational() {
        let (wf, backend) = workflow(vec![]);
        let task = Task::new("还有吗").with_workflow_state(Some(state(Phase::Completed, 0)));

        let chunks = run(&wf, task).await;

        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].content.is_empty());
        assert_eq!(final_state(&chunks), Some(state(Phase::Completed, 0)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_workflow_aborts_with_null_state() {
        let (wf, _) = workflow(vec![]);
        let task = Task::new("hi")
            .with_workflow_state(Some(WorkflowState::new("onboarding", Phase::Assessment)));

        let chunks = run(&wf, task).await;

        assert_eq!(final_state(&chunks), None);
    }

    #[tokio::test]
    async fn test_phases_never_move_backwards() {
        let cases = vec![
            (Phase::InfoCollection, 0, "hi", vec![Reply::text(INFO_COLLECTION_COMPLETE)]),
            (Phase::Assessment, 7, "D", vec![]),
            (Phase::Assessment, 14, "A", vec![]),
            (Phase::Analysis, 0, "go", vec![Reply::text("report")]),
            (Phase::Recommendation, 1, "换一个", vec![Reply::text("none")]),
            (Phase::Recommendation, 4, "满意", vec![]),
        ];

        for (phase, progress, query, replies) in cases {
            let (wf, _) = workflow(replies);
            let incoming = state(phase, progress);
            let task = Task::new(query).with_workflow_state(Some(incoming.clone()));

            let next = final_state(&run(&wf, task).await).unwrap();

            assert!(next.phase >= incoming.phase, "{incoming:?} -> {next:?}");
            if next.phase != incoming.phase {
                assert_eq!(next.progress, 0, "{incoming:?} -> {next:?}");
            }
        }
    }
}
