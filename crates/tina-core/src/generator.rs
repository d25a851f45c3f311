//! Text generation seam
//!
//! The engine hands an instruction, the prior turns and the stage's
//! generation config to a [`TextGenerator`] and gets reply text back. Backends
//! live in their own crates; [`ScriptedGenerator`] is an in-memory one for
//! tests and local runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::data_model::{ConversationTurn, Role};
use crate::error::GenerationError;
use crate::stage::GenerationConfig;

/// One request to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub instruction: String,
    /// Prior turns, already trimmed with [`seed_history`]
    pub history: Vec<ConversationTurn>,
    pub config: GenerationConfig,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// History as sent to the backend: a leading assistant greeting is dropped so
/// the conversation never starts with an assistant turn.
pub fn seed_history(history: &[ConversationTurn]) -> &[ConversationTurn] {
    match history.first() {
        Some(first) if first.role == Role::Assistant => &history[1..],
        _ => history,
    }
}

/// Replies from a fixed script and records every request it receives.
///
/// Once the script is exhausted it answers with `"reply #n"`.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generator = Self::new();
        for reply in replies {
            generator.push_reply(reply);
        }
        generator
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_script().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, error: GenerationError) {
        self.lock_script().push_back(Err(error));
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, GenerationError>>> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let n = {
            let mut requests = self
                .requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            requests.push(request);
            requests.len()
        };

        self.lock_script()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("reply #{}", n)))
    }
}
