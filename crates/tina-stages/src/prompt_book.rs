//! Prompt book loading.
//!
//! A prompt book is a YAML file with:
//! - shared template variables (`context`)
//! - the stages whose input is not a substantive answer
//! - one entry per stage: template, transition and generation limits

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use tina_core::{GenerationConfig, StageCatalog, StageDefinition, StageId};

use crate::PromptBookError;

/// Top-level prompt book structure
#[derive(Debug, Clone, Deserialize)]
pub struct PromptBook {
    pub version: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub exclude_answers_from: Vec<StageId>,
    pub stages: Vec<StagePrompt>,
}

/// A single stage entry
#[derive(Debug, Clone, Deserialize)]
pub struct StagePrompt {
    pub id: StageId,
    pub template: String,
    #[serde(default)]
    pub next: Option<StageId>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_follow_ups: Option<u32>,
}

impl From<StagePrompt> for StageDefinition {
    fn from(prompt: StagePrompt) -> Self {
        StageDefinition {
            id: prompt.id,
            template: prompt.template,
            generation: GenerationConfig {
                max_output_tokens: prompt.max_output_tokens,
                temperature: prompt.temperature,
            },
            max_follow_ups: prompt.max_follow_ups,
            next: prompt.next,
        }
    }
}

impl PromptBook {
    /// Load a prompt book from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PromptBookError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PromptBookError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Parse a prompt book from YAML content
    pub fn from_yaml(yaml: &str) -> Result<Self, PromptBookError> {
        serde_yaml::from_str(yaml).map_err(|e| PromptBookError::Parse(e.to_string()))
    }

    /// The insurance interview shipped with the crate
    pub fn builtin() -> Result<Self, PromptBookError> {
        Self::from_yaml(crate::BUILTIN_PROMPTS)
    }

    /// Compile into a validated catalog
    pub fn into_catalog(self) -> Result<StageCatalog, PromptBookError> {
        let definitions = self.stages.into_iter().map(StageDefinition::from).collect();
        Ok(StageCatalog::new(
            definitions,
            self.exclude_answers_from,
            self.context,
        )?)
    }
}
