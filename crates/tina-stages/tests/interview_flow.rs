//! End-to-end interview tests against the built-in prompt book.
//!
//! These drive `InterviewService` turn by turn with an in-memory generator
//! and check stages, counters, collected answers and what was sent to the
//! backend.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use tina_core::{
    GenerationError, GenerationRequest, InMemorySessionStore, InterviewService, ScriptedGenerator,
    SessionStore, TextGenerator, TurnEngine, TurnRequest, START_SENTINEL,
};
use tina_stages::insurance_catalog;

fn service_with(generator: Arc<dyn TextGenerator>) -> (InterviewService, Arc<InMemorySessionStore>) {
    let catalog = Arc::new(insurance_catalog().unwrap());
    let store = Arc::new(InMemorySessionStore::new());
    let engine = TurnEngine::new(catalog, generator);
    (InterviewService::new(engine, store.clone()), store)
}

async fn turn(service: &InterviewService, id: &str, input: &str) -> (String, u32, usize) {
    let result = service.take_turn(TurnRequest::new(id, input)).await.unwrap();
    (
        result.session.stage,
        result.session.follow_up_count,
        result.session.answers.len(),
    )
}

// =============================================================================
// Scripted Conversations
// =============================================================================

#[tokio::test]
async fn test_seven_turn_interview() {
    let generator = Arc::new(ScriptedGenerator::new());
    let (service, store) = service_with(generator.clone());

    let script = [
        (START_SENTINEL, "awaiting_opt_in_response", 0, 0),
        ("Yes, go ahead", "asking_follow_ups", 0, 1),
        ("A 2016 Mazda 3, I want cover for breakdowns", "asking_follow_ups", 1, 2),
        ("About 15,000 km a year", "asking_follow_ups", 2, 3),
        ("No modifications", "pre_feedback", 3, 4),
        ("no, give me the recommendation", "generating_feedback", 3, 4),
        ("Thanks!", "interview_complete", 3, 4),
    ];

    for (input, stage, count, answers) in script {
        let got = turn(&service, "s1", input).await;
        assert_eq!(got, (stage.to_string(), count, answers), "after input: {}", input);
    }

    // Every turn made exactly one backend call
    assert_eq!(generator.call_count(), 7);

    let requests = generator.requests();
    assert!(requests[0].instruction.contains("named Tina"));
    assert!(requests[4].instruction.contains("question phase is complete"));
    assert_eq!(requests[4].config.max_output_tokens, Some(100));

    let feedback = &requests[5];
    assert!(feedback.instruction.contains("- Answer 1: Yes, go ahead"));
    assert!(feedback.instruction.contains("- Answer 4: No modifications"));
    assert!(!feedback.instruction.contains("give me the recommendation"));
    assert_eq!(feedback.config.max_output_tokens, Some(500));

    // The greeting opened the history, so it is never sent as seed
    assert!(requests
        .iter()
        .all(|r| r.history.first().map_or(true, |t| t.text != "reply #1")));

    let session = store.get("s1").await.unwrap();
    // 6 user messages (sentinel excluded) + 7 replies
    assert_eq!(session.history.len(), 13);
}

#[tokio::test]
async fn test_yes_reopens_follow_ups() {
    let generator = Arc::new(ScriptedGenerator::new());
    let (service, _) = service_with(generator.clone());

    turn(&service, "s1", START_SENTINEL).await;
    turn(&service, "s1", "ok").await;
    turn(&service, "s1", "a motorbike").await;
    turn(&service, "s1", "commuting").await;
    assert_eq!(turn(&service, "s1", "garaged").await.0, "pre_feedback");

    let (stage, count, answers) = turn(&service, "s1", "YES, one more thing").await;
    assert_eq!(stage, "asking_follow_ups");
    assert_eq!(count, 0);
    assert_eq!(answers, 4);
    assert!(generator
        .requests()
        .last()
        .unwrap()
        .instruction
        .contains("ask one relevant follow-up question"));

    let (_, count, answers) = turn(&service, "s1", "it has a tow bar").await;
    assert_eq!(count, 1);
    assert_eq!(answers, 5);
}

#[tokio::test]
async fn test_unclear_pre_feedback_answer() {
    let generator = Arc::new(ScriptedGenerator::new());
    let (service, _) = service_with(generator.clone());

    for input in [START_SENTINEL, "sure", "a van", "business use", "diesel"] {
        turn(&service, "s1", input).await;
    }
    let calls = generator.call_count();

    let result = service
        .take_turn(TurnRequest::new("s1", "hmm, maybe"))
        .await
        .unwrap();
    assert_eq!(result.session.stage, "pre_feedback");
    assert!(result.reply.contains("I didn't quite catch that"));
    assert!(!result.generated);
    assert_eq!(generator.call_count(), calls);
}

// =============================================================================
// Concurrency
// =============================================================================

/// Sleeps before every reply so concurrent turns overlap.
struct SlowGenerator;

#[async_trait]
impl TextGenerator for SlowGenerator {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        tokio::time::sleep(Duration::from_millis(15)).await;
        Ok("noted".to_string())
    }
}

#[tokio::test]
async fn test_same_session_turns_are_serialized() {
    let (service, store) = service_with(Arc::new(SlowGenerator));
    let service = Arc::new(service);

    turn(&service, "s1", START_SENTINEL).await;
    turn(&service, "s1", "yes").await;

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .take_turn(TurnRequest::new("s1", format!("answer {}", i)))
                    .await
                    .unwrap()
                    .session
                    .follow_up_count
            })
        })
        .collect();

    let mut counts = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap());
    }
    counts.sort();
    assert_eq!(counts, vec![1, 2, 3]);

    let session = store.get("s1").await.unwrap();
    assert_eq!(session.stage, "pre_feedback");
    assert_eq!(session.follow_up_count, 3);
    assert_eq!(session.answers.len(), 4);
    // greeting + ("yes", reply) + 3 x (answer, reply)
    assert_eq!(session.history.len(), 9);
}

/// Holds any turn whose latest message is "block me" until released.
struct GatedGenerator {
    gate: Notify,
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if request.history.last().map(|t| t.text.as_str()) == Some("block me") {
            self.gate.notified().await;
        }
        Ok("ok".to_string())
    }
}

#[tokio::test]
async fn test_distinct_sessions_do_not_block() {
    let generator = Arc::new(GatedGenerator {
        gate: Notify::new(),
    });
    let (service, _) = service_with(generator.clone());
    let service = Arc::new(service);

    turn(&service, "a", START_SENTINEL).await;
    let blocked = {
        let service = service.clone();
        tokio::spawn(async move { service.take_turn(TurnRequest::new("a", "block me")).await })
    };

    // "a" is stuck inside its backend call; "b" must still go through
    let other = tokio::time::timeout(
        Duration::from_secs(2),
        service.take_turn(TurnRequest::new("b", START_SENTINEL)),
    )
    .await
    .expect("session b was blocked by session a")
    .unwrap();
    assert_eq!(other.session.stage, "awaiting_opt_in_response");

    generator.gate.notify_one();
    let result = blocked.await.unwrap().unwrap();
    assert_eq!(result.session.stage, "asking_follow_ups");
}
