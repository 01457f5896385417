//! Assessment specialist: deterministic, never calls the model.

use careerflow_core::prelude::{ChunkStream, StreamChunk, WorkflowState};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::questions::{OPTION_LABELS, QUESTION_BANK, QUESTION_COUNT};
use crate::{
    agent_types::AgentConfig,
    error::{AgentError, Result},
};

pub const ASSESSMENT_NODE_ID: &str = "assessment";

/// Marker opening every rendered question; also how history recognises one.
pub const QUESTION_CARD_MARKER: &str = "【职业测评】";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: String,
    pub text: String,
}

/// Structured question object sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCard {
    pub question: String,
    pub options: Vec<QuestionOption>,
}

pub fn is_question_card(content: &str) -> bool {
    content.contains(QUESTION_CARD_MARKER)
}

#[derive(Debug, Clone)]
pub struct AssessmentAgent {
    config: AgentConfig,
}

impl Default for AssessmentAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentAgent {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::new(ASSESSMENT_NODE_ID, "职业测评：逐题展示固定的测评问题"),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Question at 0-based `progress`.
    pub fn question_card(&self, progress: u32) -> Result<QuestionCard> {
        let question = QUESTION_BANK.get(progress as usize).ok_or_else(|| {
            AgentError::workflow(format!(
                "assessment progress {progress} outside question bank of {QUESTION_COUNT}"
            ))
        })?;

        Ok(QuestionCard {
            question: question.question.to_string(),
            options: OPTION_LABELS
                .iter()
                .zip(question.options.iter())
                .map(|(label, text)| QuestionOption {
                    label: label.to_string(),
                    text: text.to_string(),
                })
                .collect(),
        })
    }

    /// Progress header plus the question object as a fenced JSON block.
    pub fn render(&self, progress: u32) -> Result<String> {
        let card = self.question_card(progress)?;
        let body = serde_json::to_string_pretty(&card)?;
        Ok(format!(
            "{QUESTION_CARD_MARKER}第 {}/{QUESTION_COUNT} 题\n\n```json\n{body}\n```\n\n请回复选项字母（A/B/C/D）。",
            progress + 1
        ))
    }

    /// One terminal chunk with the question and the state left untouched;
    /// progress only moves when the next turn brings a valid answer.
    pub fn stream_turn(&self, state: WorkflowState) -> Result<ChunkStream> {
        debug!(progress = state.progress, "Presenting assessment question");
        let content = self.render(state.progress)?;
        let chunk = StreamChunk::terminal(content, Some(state));
        Ok(stream::once(async move { chunk }).boxed())
    }
}

#[cfg(test)]
mod tests {
    use careerflow_core::prelude::{CAREER_POSITIONING, Phase};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parsing::first_object_as;

    #[test]
    fn test_every_index_maps_to_its_question() {
        let agent = AssessmentAgent::new();
        for (index, expected) in QUESTION_BANK.iter().enumerate() {
            let card = agent.question_card(index as u32).unwrap();
            assert_eq!(card.question, expected.question);
            assert_eq!(card.options.len(), 4);
            assert_eq!(card.options[3].label, "D");
            assert_eq!(card.options[0].text, expected.options[0]);
        }
    }

    #[test]
    fn test_out_of_range_is_workflow_error() {
        let err = AssessmentAgent::new().question_card(15).unwrap_err();
        assert_eq!(err.category(), "workflow");
    }

    #[test]
    fn test_rendered_card_round_trips() {
        let rendered = AssessmentAgent::new().render(4).unwrap();
        assert!(rendered.starts_with(QUESTION_CARD_MARKER));
        assert!(rendered.contains("第 5/15 题"));

        let card: QuestionCard = first_object_as(&rendered).unwrap();
        assert_eq!(card.question, QUESTION_BANK[4].question);
    }

    #[tokio::test]
    async fn test_stream_turn_keeps_state() {
        let state = WorkflowState::new(CAREER_POSITIONING, Phase::Assessment).with_progress(2);
        let chunks: Vec<StreamChunk> = AssessmentAgent::new()
            .stream_turn(state.clone())
            .unwrap()
            .collect()
            .await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].finished);
        assert_eq!(chunks[0].workflow_state, Some(state));
        assert!(chunks[0].content.contains(QUESTION_BANK[2].question));
    }
}
