//! Interview Service: one request, one turn
//!
//! Validates input, serializes turns per session id, runs the engine on a
//! working copy of the session and writes the copy back only when the turn
//! succeeded. A failed turn leaves the stored session exactly as it was, user
//! message included.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

use crate::context::TurnContext;
use crate::data_model::{ConversationTurn, Session};
use crate::engine::{TurnEngine, TurnInput};
use crate::error::InterviewError;
use crate::session::{SessionLocks, SessionStore};

/// Input that opens the interview without being recorded as a message.
pub const START_SENTINEL: &str = "start interview";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub session_id: Option<String>,
    pub user_response: Option<String>,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, user_response: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            user_response: Some(user_response.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnResult {
    pub reply: String,
    pub session: Session,
    pub generated: bool,
}

pub struct InterviewService {
    engine: TurnEngine,
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
}

impl InterviewService {
    pub fn new(engine: TurnEngine, store: Arc<dyn SessionStore>) -> Self {
        Self {
            engine,
            store,
            locks: SessionLocks::new(),
        }
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    /// Current state of a session, if it exists.
    pub async fn snapshot(&self, session_id: &str) -> Option<Session> {
        self.store.get(session_id).await
    }

    pub async fn take_turn(&self, request: TurnRequest) -> Result<TurnResult, InterviewError> {
        let (session_id, user_input) = match (request.session_id, request.user_response) {
            (Some(id), Some(input)) if !id.is_empty() => (id, input),
            _ => {
                return Err(InterviewError::InvalidInput(
                    "Missing sessionId or userResponse.".to_string(),
                ))
            }
        };

        let ctx = TurnContext::new(session_id);
        let span = info_span!("turn", session_id = %ctx.session_id, trace_id = %ctx.trace_id);
        self.run_turn(&ctx, &user_input).instrument(span).await
    }

    async fn run_turn(
        &self,
        ctx: &TurnContext,
        user_input: &str,
    ) -> Result<TurnResult, InterviewError> {
        let _guard = self.locks.acquire(&ctx.session_id).await;

        let mut session = self
            .store
            .get(&ctx.session_id)
            .await
            .unwrap_or_else(|| Session::new(ctx.session_id.clone()));

        if user_input != START_SENTINEL {
            session.history.push(ConversationTurn::user(user_input));
            if self.engine.catalog().collects_answers(&session.stage) {
                session.answers.push(user_input.to_string());
            }
        }

        let outcome = self
            .engine
            .advance(TurnInput {
                stage: &session.stage,
                follow_up_count: session.follow_up_count,
                answers: &session.answers,
                history: &session.history,
                latest: user_input,
            })
            .await
            .map_err(|e| {
                error!(error = %e, stage = %session.stage, "Turn failed, session left unchanged");
                e
            })?;

        if !outcome.reply.is_empty() {
            session.history.push(ConversationTurn::assistant(outcome.reply.clone()));
        }
        info!(
            from = %session.stage,
            to = %outcome.next_stage,
            follow_ups = outcome.next_follow_up_count,
            elapsed_ms = ctx.elapsed_ms(),
            "Turn complete"
        );
        session.stage = outcome.next_stage;
        session.follow_up_count = outcome.next_follow_up_count;
        session.updated_at = chrono::Utc::now();

        self.store.put(&ctx.session_id, session.clone()).await;

        Ok(TurnResult {
            reply: outcome.reply,
            session,
            generated: outcome.generated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::data_model::Role;
    use crate::error::GenerationError;
    use crate::generator::ScriptedGenerator;
    use crate::session::InMemorySessionStore;

    fn service() -> (InterviewService, Arc<ScriptedGenerator>, Arc<InMemorySessionStore>) {
        let generator = Arc::new(ScriptedGenerator::new());
        let store = Arc::new(InMemorySessionStore::new());
        let engine = TurnEngine::new(Arc::new(sample_catalog()), generator.clone());
        (InterviewService::new(engine, store.clone()), generator, store)
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let (service, generator, store) = service();

        let cases = [
            TurnRequest::default(),
            TurnRequest {
                session_id: Some("s1".to_string()),
                user_response: None,
            },
            TurnRequest {
                session_id: Some(String::new()),
                user_response: Some("hi".to_string()),
            },
        ];
        for request in cases {
            let err = service.take_turn(request).await.unwrap_err();
            assert!(err.is_client_error());
        }

        assert!(store.is_empty().await);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_start_sentinel_not_recorded() {
        let (service, _, _) = service();
        let result = service
            .take_turn(TurnRequest::new("s1", START_SENTINEL))
            .await
            .unwrap();

        assert_eq!(result.session.stage, "awaiting_opt_in_response");
        assert_eq!(result.session.follow_up_count, 0);
        assert_eq!(result.session.history.len(), 1);
        assert_eq!(result.session.history[0].role, Role::Assistant);
        assert!(result.session.answers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_session_unchanged() {
        let (service, generator, store) = service();
        service
            .take_turn(TurnRequest::new("s1", START_SENTINEL))
            .await
            .unwrap();
        let before = store.get("s1").await.unwrap();

        generator.push_failure(GenerationError::Backend {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert!(service.take_turn(TurnRequest::new("s1", "yes")).await.is_err());

        let after = store.get("s1").await.unwrap();
        assert_eq!(after.history, before.history);
        assert_eq!(after.stage, before.stage);
        assert_eq!(after.answers, before.answers);

        // Retrying the same turn works once the backend recovers
        let retried = service.take_turn(TurnRequest::new("s1", "yes")).await.unwrap();
        assert_eq!(retried.session.stage, "asking_follow_ups");
        assert_eq!(retried.session.answers, vec!["yes".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_first_turn_creates_nothing() {
        let (service, generator, store) = service();
        generator.push_failure(GenerationError::Timeout(100));

        assert!(service
            .take_turn(TurnRequest::new("s1", START_SENTINEL))
            .await
            .is_err());
        assert!(store.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_stage_session_gets_apology() {
        let (service, generator, store) = service();
        let mut session = Session::new("legacy");
        session.stage = "collecting_details".to_string();
        session.follow_up_count = 1;
        store.put("legacy", session).await;

        let result = service
            .take_turn(TurnRequest::new("legacy", "hello"))
            .await
            .unwrap();

        assert_eq!(result.reply, crate::engine::UNKNOWN_STAGE_REPLY);
        assert_eq!(result.session.stage, "collecting_details");
        assert_eq!(result.session.follow_up_count, 1);
        assert_eq!(generator.call_count(), 0);
    }
}
