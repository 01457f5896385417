//! Workflow state for multi-turn guided processes.
//!
//! A [`WorkflowState`] is plain data: it is returned from every turn in the
//! terminal [`StreamChunk`](crate::chunk::StreamChunk) and handed back by the
//! caller on the next turn. Nothing here is shared or mutated in place.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Identifier of the career-positioning workflow.
pub const CAREER_POSITIONING: &str = "career-positioning";

/// Trait representing a state in a workflow.
///
/// States define the current position in the workflow and control
/// which transitions are valid.
pub trait FlowState:
    Clone + PartialEq + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static
{
    /// Returns true if this is a terminal state (workflow should stop).
    fn is_terminal(&self) -> bool;

    /// Returns true if this state can transition to the target state.
    /// Default implementation allows all transitions.
    fn can_transition_to(&self, _target: &Self) -> bool {
        true
    }
}

/// Phases of the career-positioning workflow, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    InfoCollection,
    Assessment,
    Analysis,
    Recommendation,
    Completed,
}

impl Phase {
    /// Wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::InfoCollection => "info_collection",
            Phase::Assessment => "assessment",
            Phase::Analysis => "analysis",
            Phase::Recommendation => "recommendation",
            Phase::Completed => "completed",
        }
    }

    fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FlowState for Phase {
    fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed)
    }

    /// Phases only ever move forward; skipping ahead is allowed.
    fn can_transition_to(&self, target: &Self) -> bool {
        !self.is_terminal() && target.rank() > self.rank()
    }
}

/// Serializable position inside a workflow.
///
/// `progress` is phase-local (assessment questions answered, recommendations
/// shown) and is reset to 0 on every phase change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub workflow_id: String,
    pub phase: Phase,
    #[serde(default)]
    pub progress: u32,
}

impl WorkflowState {
    /// Create a state at the start of `phase`.
    pub fn new(workflow_id: impl Into<String>, phase: Phase) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            phase,
            progress: 0,
        }
    }

    /// Fresh career-positioning state, ready to collect background information.
    pub fn career_positioning() -> Self {
        Self::new(CAREER_POSITIONING, Phase::InfoCollection)
    }

    pub fn is_career_positioning(&self) -> bool {
        self.workflow_id == CAREER_POSITIONING
    }

    /// True for a career-positioning workflow that has not completed yet.
    pub fn is_active_career_positioning(&self) -> bool {
        self.is_career_positioning() && !self.phase.is_terminal()
    }

    /// Move to `target`, resetting progress.
    pub fn advance_to(&self, target: Phase) -> Result<Self> {
        let transition = StateTransition::new(self.phase, target);
        if !transition.is_valid() {
            return Err(FlowError::invalid_transition(self.phase, target));
        }
        Ok(Self::new(self.workflow_id.clone(), target))
    }

    /// Same phase, different progress.
    pub fn with_progress(&self, progress: u32) -> Self {
        Self {
            progress,
            ..self.clone()
        }
    }

    pub fn increment_progress(&self) -> Self {
        self.with_progress(self.progress.saturating_add(1))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// State transition information.
#[derive(Clone, Debug)]
pub struct StateTransition<S: FlowState> {
    /// Source state
    pub from: S,
    /// Target state
    pub to: S,
}

impl<S: FlowState> StateTransition<S> {
    /// Create a new state transition.
    pub fn new(from: S, to: S) -> Self {
        Self { from, to }
    }

    /// Check if this transition is valid.
    pub fn is_valid(&self) -> bool {
        self.from.can_transition_to(&self.to)
    }
}
