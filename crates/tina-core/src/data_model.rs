//! Data Model: ConversationTurn, Session, TurnOutcome
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::StageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One exchange in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Per-conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub history: Vec<ConversationTurn>,
    /// Recorded stage name. Kept as text so a stale or foreign value survives
    /// and gets reported instead of failing deserialization.
    pub stage: String,
    pub follow_up_count: u32,
    /// Substantive answers, in the order they were given
    pub answers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: Vec::new(),
            stage: StageId::Initial.as_str().to_string(),
            follow_up_count: 0,
            answers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of one engine step. Only ever returned, never applied by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub next_stage: String,
    pub next_follow_up_count: u32,
    /// Whether the backend was called to produce `reply`
    pub generated: bool,
}
