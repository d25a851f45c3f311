//! Turn Context: identifiers carried through one request
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: String,
    pub trace_id: String,
    pub started_at: Instant,
}

impl TurnContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
