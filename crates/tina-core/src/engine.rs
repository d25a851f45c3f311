//! Turn Engine: the interview state machine
//!
//! One call to [`TurnEngine::advance`] is one turn. The engine first decides a
//! [`Transition`] from the current stage, the follow-up counter and the latest
//! user input; that decision is pure. It then performs at most one backend call
//! for the stage the transition names and returns the outcome. Nothing is
//! mutated: applying the outcome to a session is the caller's job.
//!
//! Two transitions span two catalog stages in a single turn, so the caller
//! always gets a reply to show:
//!
//! ```text
//! asking_follow_ups ──(budget exceeded)──▶ pre_feedback        (generates pre_feedback)
//! pre_feedback ──────("yes")─────────────▶ asking_follow_ups   (generates asking_follow_ups)
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::catalog::StageCatalog;
use crate::data_model::{ConversationTurn, TurnOutcome};
use crate::error::{GenerationError, InterviewError};
use crate::generator::{seed_history, GenerationRequest, TextGenerator};
use crate::stage::StageId;

/// Follow-up budget used when the catalog leaves it unset.
pub const DEFAULT_FOLLOW_UP_BUDGET: u32 = 2;

pub const UNKNOWN_STAGE_REPLY: &str = "An error occurred (unknown stage).";

pub const CLARIFY_REPLY: &str = "I didn't quite catch that. Please type \"yes\" to ask another question, or \"no\" to get your insurance recommendation.";

/// What a turn produces besides the state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send this stage's instruction to the backend
    Generate(StageId),
    /// Answer with fixed text, no backend call
    Reply(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: Action,
    pub next_stage: StageId,
    pub next_follow_up_count: u32,
}

/// Inputs for one turn, borrowed from the session.
#[derive(Debug, Clone, Copy)]
pub struct TurnInput<'a> {
    pub stage: &'a str,
    pub follow_up_count: u32,
    pub answers: &'a [String],
    pub history: &'a [ConversationTurn],
    pub latest: &'a str,
}

pub struct TurnEngine {
    catalog: Arc<StageCatalog>,
    generator: Arc<dyn TextGenerator>,
    timeout: Option<Duration>,
}

impl TurnEngine {
    pub fn new(catalog: Arc<StageCatalog>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            catalog,
            generator,
            timeout: None,
        }
    }

    /// Fail a turn whose backend call takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Decide where the turn goes. No I/O.
    pub fn decide(&self, stage: StageId, follow_up_count: u32, latest: &str) -> Transition {
        let def = self.catalog.get(stage);

        match stage {
            StageId::Initial | StageId::AwaitingOptInResponse => Transition {
                action: Action::Generate(stage),
                next_stage: def.next.unwrap_or(stage),
                next_follow_up_count: 0,
            },
            StageId::AskingFollowUps => {
                let count = follow_up_count.saturating_add(1);
                let budget = def.max_follow_ups.unwrap_or(DEFAULT_FOLLOW_UP_BUDGET);

                if count > budget {
                    let next = def.next.unwrap_or(StageId::PreFeedback);
                    Transition {
                        action: Action::Generate(next),
                        next_stage: next,
                        next_follow_up_count: count,
                    }
                } else {
                    Transition {
                        action: Action::Generate(stage),
                        next_stage: stage,
                        next_follow_up_count: count,
                    }
                }
            }
            StageId::PreFeedback => {
                // Plain substring match: "not yet" reads as "no", "yes I think" as "yes".
                let answer = latest.to_lowercase();
                if answer.contains("yes") {
                    Transition {
                        action: Action::Generate(StageId::AskingFollowUps),
                        next_stage: StageId::AskingFollowUps,
                        next_follow_up_count: 0,
                    }
                } else if answer.contains("no") {
                    let next = def.next.unwrap_or(StageId::GeneratingFeedback);
                    Transition {
                        action: Action::Generate(next),
                        next_stage: next,
                        next_follow_up_count: follow_up_count,
                    }
                } else {
                    Transition {
                        action: Action::Reply(CLARIFY_REPLY),
                        next_stage: stage,
                        next_follow_up_count: follow_up_count,
                    }
                }
            }
            StageId::GeneratingFeedback | StageId::InterviewComplete => Transition {
                action: Action::Generate(stage),
                next_stage: def.next.unwrap_or(stage),
                next_follow_up_count: follow_up_count,
            },
        }
    }

    /// Run one turn.
    ///
    /// An unrecognised stage is answered with a fixed reply and leaves stage
    /// and counter as they were. Backend failures are returned unchanged.
    pub async fn advance(&self, input: TurnInput<'_>) -> Result<TurnOutcome, InterviewError> {
        let stage = match input.stage.parse::<StageId>() {
            Ok(stage) => stage,
            Err(_) => {
                warn!(stage = input.stage, "Unknown interview stage");
                return Ok(TurnOutcome {
                    reply: UNKNOWN_STAGE_REPLY.to_string(),
                    next_stage: input.stage.to_string(),
                    next_follow_up_count: input.follow_up_count,
                    generated: false,
                });
            }
        };

        let transition = self.decide(stage, input.follow_up_count, input.latest);
        debug!(
            from = %stage,
            to = %transition.next_stage,
            follow_ups = transition.next_follow_up_count,
            "Turn transition"
        );

        let (reply, generated) = match transition.action {
            Action::Reply(text) => (text.to_string(), false),
            Action::Generate(target) => {
                let reply = self.generate_for(target, &input).await?;
                (reply, true)
            }
        };

        Ok(TurnOutcome {
            reply,
            next_stage: transition.next_stage.as_str().to_string(),
            next_follow_up_count: transition.next_follow_up_count,
            generated,
        })
    }

    async fn generate_for(
        &self,
        target: StageId,
        input: &TurnInput<'_>,
    ) -> Result<String, InterviewError> {
        let def = self.catalog.get(target);
        let request = GenerationRequest {
            instruction: self.catalog.instruction(target, input.answers, input.latest)?,
            history: seed_history(input.history).to_vec(),
            config: def.generation.clone(),
        };

        let call = self.generator.generate(request);
        let reply = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| GenerationError::Timeout(limit.as_millis() as u64))??,
            None => call.await?,
        };

        Ok(reply)
    }
}
