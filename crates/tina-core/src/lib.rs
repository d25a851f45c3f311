//! Tina Core: Stage Catalog, Turn Engine, and Session Orchestration
//!
//! A scripted interview runs through a fixed set of stages. Each turn the
//! engine picks the instruction to send to a text-generation backend and the
//! stage to move to; the service wraps that in per-session serialization and
//! copy-on-success persistence.

pub mod catalog;
pub mod context;
pub mod data_model;
pub mod engine;
pub mod error;
pub mod generator;
pub mod service;
pub mod session;
pub mod stage;

pub use catalog::StageCatalog;
pub use context::TurnContext;
pub use data_model::{ConversationTurn, Role, Session, TurnOutcome};
pub use engine::{Action, Transition, TurnEngine, TurnInput};
pub use error::{GenerationError, InterviewError};
pub use generator::{seed_history, GenerationRequest, ScriptedGenerator, TextGenerator};
pub use service::{InterviewService, TurnRequest, TurnResult, START_SENTINEL};
pub use session::{InMemorySessionStore, SessionLocks, SessionStore};
pub use stage::{GenerationConfig, StageDefinition, StageId};

/// Engine version reported by the API
pub const TINA_VERSION: &str = env!("CARGO_PKG_VERSION");
