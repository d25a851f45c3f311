//! Stage identifiers and per-stage definitions
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InterviewError;

/// One named phase of the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Initial,
    AwaitingOptInResponse,
    AskingFollowUps,
    PreFeedback,
    GeneratingFeedback,
    InterviewComplete,
}

impl StageId {
    /// All stages in canonical interview order.
    pub const ALL: [StageId; 6] = [
        StageId::Initial,
        StageId::AwaitingOptInResponse,
        StageId::AskingFollowUps,
        StageId::PreFeedback,
        StageId::GeneratingFeedback,
        StageId::InterviewComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::AwaitingOptInResponse => "awaiting_opt_in_response",
            Self::AskingFollowUps => "asking_follow_ups",
            Self::PreFeedback => "pre_feedback",
            Self::GeneratingFeedback => "generating_feedback",
            Self::InterviewComplete => "interview_complete",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = InterviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| InterviewError::UnknownStage(s.to_string()))
    }
}

/// Caller-side knobs forwarded to the generation backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on reply length, in backend tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Everything the engine knows about a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefinition {
    pub id: StageId,
    /// Handlebars template for the instruction sent to the backend
    pub template: String,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Follow-up budget, only meaningful for the repeating stage
    #[serde(default)]
    pub max_follow_ups: Option<u32>,
    /// Absent for the terminal stage
    #[serde(default)]
    pub next: Option<StageId>,
}

impl StageDefinition {
    pub fn new(id: StageId, template: impl Into<String>) -> Self {
        Self {
            id,
            template: template.into(),
            generation: GenerationConfig::default(),
            max_follow_ups: None,
            next: None,
        }
    }

    pub fn then(mut self, next: StageId) -> Self {
        self.next = Some(next);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.generation.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_follow_up_budget(mut self, budget: u32) -> Self {
        self.max_follow_ups = Some(budget);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}
