//! Stage Catalog: the fixed table of interview stages
//!
//! Holds one [`StageDefinition`] per [`StageId`], the set of stages whose user
//! input is not a substantive answer, and the compiled instruction templates.
//! Built once at startup and shared read-only afterwards.

use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::error::InterviewError;
use crate::stage::{StageDefinition, StageId};

handlebars_helper!(inc: |v: u64| v + 1);

pub struct StageCatalog {
    /// Indexed by `StageId as usize`
    stages: Vec<StageDefinition>,
    excluded: Vec<StageId>,
    context: Map<String, Value>,
    templates: Handlebars<'static>,
}

impl StageCatalog {
    /// Build and validate a catalog.
    ///
    /// Every stage must be defined exactly once, no stage may name itself as
    /// `next`, exactly one stage may be terminal and every template must
    /// compile. Any violation is a misconfiguration.
    pub fn new(
        definitions: Vec<StageDefinition>,
        excluded: Vec<StageId>,
        context: Map<String, Value>,
    ) -> Result<Self, InterviewError> {
        let mut by_id: BTreeMap<StageId, StageDefinition> = BTreeMap::new();
        for def in definitions {
            let id = def.id;
            if by_id.insert(id, def).is_some() {
                return Err(InterviewError::Misconfiguration(format!(
                    "stage '{}' defined more than once",
                    id
                )));
            }
        }

        let mut stages = Vec::with_capacity(StageId::ALL.len());
        for id in StageId::ALL {
            let def = by_id.remove(&id).ok_or_else(|| {
                InterviewError::Misconfiguration(format!("stage '{}' is not defined", id))
            })?;
            stages.push(def);
        }

        for def in &stages {
            if def.next == Some(def.id) {
                return Err(InterviewError::Misconfiguration(format!(
                    "stage '{}' transitions to itself",
                    def.id
                )));
            }
        }

        let terminals = stages.iter().filter(|d| d.is_terminal()).count();
        if terminals != 1 {
            return Err(InterviewError::Misconfiguration(format!(
                "expected exactly one terminal stage, found {}",
                terminals
            )));
        }

        let mut templates = Handlebars::new();
        templates.register_escape_fn(no_escape);
        templates.register_helper("inc", Box::new(inc));
        for def in &stages {
            templates
                .register_template_string(def.id.as_str(), &def.template)
                .map_err(|e| {
                    InterviewError::Misconfiguration(format!(
                        "template for '{}' does not compile: {}",
                        def.id, e
                    ))
                })?;
        }

        Ok(Self {
            stages,
            excluded,
            context,
            templates,
        })
    }

    /// Resolve a recorded stage name.
    pub fn lookup(&self, name: &str) -> Result<&StageDefinition, InterviewError> {
        let id: StageId = name.parse()?;
        Ok(self.get(id))
    }

    pub fn get(&self, id: StageId) -> &StageDefinition {
        &self.stages[id as usize]
    }

    /// Stages in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &StageDefinition> {
        self.stages.iter()
    }

    pub fn excluded(&self) -> &[StageId] {
        &self.excluded
    }

    /// Whether input given while in `stage` counts as a substantive answer.
    ///
    /// Works on the raw recorded name so sessions carrying an unrecognised
    /// stage still follow the exclusion list literally.
    pub fn collects_answers(&self, stage: &str) -> bool {
        !self.excluded.iter().any(|id| id.as_str() == stage)
    }

    /// Render the instruction for `id`. Pure: same input, same text.
    pub fn instruction(
        &self,
        id: StageId,
        answers: &[String],
        latest: &str,
    ) -> Result<String, InterviewError> {
        let mut data = self.context.clone();
        data.insert("answers".to_string(), json!(answers));
        data.insert("latest".to_string(), json!(latest));

        self.templates
            .render(id.as_str(), &Value::Object(data))
            .map_err(|e| InterviewError::Prompt(format!("{}: {}", id, e)))
    }
}
