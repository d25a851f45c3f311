//! Tina Stages: the insurance interview prompt book
//!
//! Stage instructions, transitions and generation limits are kept in a YAML
//! prompt book and compiled into a [`StageCatalog`] at startup.
//!
//! # Interview Flow
//!
//! ```text
//! initial → awaiting_opt_in_response → asking_follow_ups ⟲ → pre_feedback
//!                                              ↑                  │
//!                                              └──── "yes" ───────┤
//!                                                                 ↓ "no"
//!                                   interview_complete ← generating_feedback
//! ```
//!
//! # Example
//!
//! ```
//! let catalog = tina_stages::insurance_catalog().unwrap();
//! assert!(!catalog.collects_answers("pre_feedback"));
//! ```

pub mod prompt_book;

pub use prompt_book::{PromptBook, StagePrompt};

use std::path::Path;
use thiserror::Error;
use tina_core::{InterviewError, StageCatalog};

/// Built-in prompt book
pub const BUILTIN_PROMPTS: &str = include_str!("../prompts/insurance.yaml");

#[derive(Debug, Error)]
pub enum PromptBookError {
    #[error("Prompt book read failed: {0}")]
    Read(String),
    #[error("Prompt book parse failed: {0}")]
    Parse(String),
    #[error("Prompt book rejected: {0}")]
    Catalog(#[from] InterviewError),
}

impl From<PromptBookError> for InterviewError {
    fn from(err: PromptBookError) -> Self {
        match err {
            PromptBookError::Catalog(inner) => inner,
            other => InterviewError::Misconfiguration(other.to_string()),
        }
    }
}

/// Catalog for the built-in insurance interview
pub fn insurance_catalog() -> Result<StageCatalog, PromptBookError> {
    PromptBook::builtin()?.into_catalog()
}

/// Catalog from `path` when given, otherwise the built-in one
pub fn load_catalog(path: Option<&Path>) -> Result<StageCatalog, PromptBookError> {
    match path {
        Some(path) => PromptBook::load(path)?.into_catalog(),
        None => insurance_catalog(),
    }
}
