//! Structure mutation operations (form builder surface)
//!
//! Every operation either applies completely or returns an [`EditError`]
//! with the structure left untouched. Errors name a stale or invalid
//! target, so a UI holding outdated ids can treat them as no-ops.

use thiserror::Error;

use super::{CalculationRuleBlock, FieldDefinition, FieldPatch, FormStructure, StepContent, SubStep};
use crate::domain::value_objects::{FieldType, PhaseId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    #[error("sub-step '{step_id}' not found")]
    StepNotFound { step_id: String },

    #[error("field '{field_id}' not found")]
    FieldNotFound { field_id: String },

    #[error("sub-step '{step_id}' holds calculation rules, not fields")]
    NotAFieldsStep { step_id: String },

    #[error("sub-step '{step_id}' holds fields, not calculation rules")]
    NotACalculationStep { step_id: String },

    #[error("cannot move item {from} to {to}: list has {len} entries")]
    IndexOutOfRange { from: usize, to: usize, len: usize },

    #[error("'{name}' already exists")]
    DuplicateName { name: String },

    #[error("'{name}' not found")]
    NameNotFound { name: String },
}

/// Phase designation accepted by the editor: a typed [`PhaseId`] or its
/// storage string (`"cotation"`, `"souscription"`).
pub trait IntoPhaseId {
    fn into_phase_id(self) -> Result<PhaseId, EditError>;
}

impl IntoPhaseId for PhaseId {
    fn into_phase_id(self) -> Result<PhaseId, EditError> {
        Ok(self)
    }
}

impl IntoPhaseId for &str {
    fn into_phase_id(self) -> Result<PhaseId, EditError> {
        self.parse().map_err(|_| EditError::UnknownPhase(self.to_string()))
    }
}

impl IntoPhaseId for &String {
    fn into_phase_id(self) -> Result<PhaseId, EditError> {
        self.as_str().into_phase_id()
    }
}

fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), EditError> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(EditError::IndexOutOfRange { from, to, len });
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

impl FormStructure {
    /// Id not used by any sub-step or field of this structure
    fn fresh_id(&self, prefix: &str) -> String {
        loop {
            let candidate = format!("{}_{}", prefix, uuid::Uuid::new_v4().simple());
            let taken = self.find_step(&candidate).is_some() || self.find_field(&candidate).is_some();
            if !taken {
                return candidate;
            }
        }
    }

    fn step_in_phase_mut(&mut self, phase: PhaseId, step_id: &str) -> Result<&mut SubStep, EditError> {
        self.phase_mut(phase)
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| EditError::StepNotFound { step_id: step_id.to_string() })
    }

    fn step_mut(&mut self, step_id: &str) -> Result<&mut SubStep, EditError> {
        self.phases
            .iter_mut()
            .flat_map(|p| p.steps.iter_mut())
            .find(|s| s.id == step_id)
            .ok_or_else(|| EditError::StepNotFound { step_id: step_id.to_string() })
    }

    /// Append an empty fields sub-step; returns its id
    pub fn add_step(&mut self, phase: impl IntoPhaseId, title: impl Into<String>) -> Result<String, EditError> {
        let phase = phase.into_phase_id()?;
        let id = self.fresh_id("step");
        self.phase_mut(phase).steps.push(SubStep::fields(id.clone(), title, vec![]));
        tracing::debug!("Added sub-step {} to phase {}", id, phase);
        Ok(id)
    }

    /// Append a calculation sub-step with an empty rule block; returns its id
    pub fn add_calculation_step(&mut self, phase: impl IntoPhaseId, title: impl Into<String>) -> Result<String, EditError> {
        let phase = phase.into_phase_id()?;
        let id = self.fresh_id("step");
        self.phase_mut(phase)
            .steps
            .push(SubStep::calculation(id.clone(), title, CalculationRuleBlock::default()));
        tracing::debug!("Added calculation sub-step {} to phase {}", id, phase);
        Ok(id)
    }

    /// Remove a sub-step. Remaining sub-steps keep their ids.
    pub fn remove_step(&mut self, phase: impl IntoPhaseId, step_id: &str) -> Result<SubStep, EditError> {
        let phase = phase.into_phase_id()?;
        let steps = &mut self.phase_mut(phase).steps;
        let index = steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| EditError::StepNotFound { step_id: step_id.to_string() })?;
        tracing::debug!("Removed sub-step {} from phase {}", step_id, phase);
        Ok(steps.remove(index))
    }

    pub fn rename_step(&mut self, step_id: &str, title: impl Into<String>) -> Result<(), EditError> {
        self.step_mut(step_id)?.title = title.into();
        Ok(())
    }

    /// Move a sub-step within its phase
    pub fn reorder_steps(&mut self, phase: impl IntoPhaseId, from: usize, to: usize) -> Result<(), EditError> {
        let phase = phase.into_phase_id()?;
        move_item(&mut self.phase_mut(phase).steps, from, to)
    }

    /// Append a library field to a fields sub-step; returns the field id
    pub fn add_field(
        &mut self,
        phase: impl IntoPhaseId,
        step_id: &str,
        field_type: FieldType,
    ) -> Result<String, EditError> {
        let phase = phase.into_phase_id()?;
        let id = self.fresh_id("field");
        let step = self.step_in_phase_mut(phase, step_id)?;
        let fields = step
            .field_list_mut()
            .ok_or_else(|| EditError::NotAFieldsStep { step_id: step_id.to_string() })?;
        fields.push(FieldDefinition::new(id.clone(), field_type));
        tracing::debug!("Added {} field {} to sub-step {}", field_type, id, step_id);
        Ok(id)
    }

    /// Merge a partial update into the field, wherever it lives
    pub fn update_field(&mut self, field_id: &str, patch: FieldPatch) -> Result<(), EditError> {
        let field = self
            .phases
            .iter_mut()
            .flat_map(|p| p.steps.iter_mut())
            .filter_map(|s| s.field_list_mut())
            .flat_map(|fields| fields.iter_mut())
            .find(|f| f.id == field_id)
            .ok_or_else(|| EditError::FieldNotFound { field_id: field_id.to_string() })?;
        field.apply(patch);
        Ok(())
    }

    /// Remove the field wherever it lives; returns the removed definition
    pub fn remove_field(&mut self, field_id: &str) -> Result<FieldDefinition, EditError> {
        for step in self.phases.iter_mut().flat_map(|p| p.steps.iter_mut()) {
            let StepContent::Fields { fields } = &mut step.content else {
                continue;
            };
            if let Some(index) = fields.iter().position(|f| f.id == field_id) {
                tracing::debug!("Removed field {} from sub-step {}", field_id, step.id);
                return Ok(fields.remove(index));
            }
        }
        Err(EditError::FieldNotFound { field_id: field_id.to_string() })
    }

    /// Move a field within one fields sub-step
    pub fn reorder_fields(&mut self, step_id: &str, from: usize, to: usize) -> Result<(), EditError> {
        let step = self.step_mut(step_id)?;
        let fields = step
            .field_list_mut()
            .ok_or_else(|| EditError::NotAFieldsStep { step_id: step_id.to_string() })?;
        move_item(fields, from, to)
    }

    /// Rule block of a calculation sub-step, for its field-level setters
    pub fn calculation_rules_mut(&mut self, step_id: &str) -> Result<&mut CalculationRuleBlock, EditError> {
        let step = self.step_mut(step_id)?;
        step.calculation_rules_mut()
            .ok_or_else(|| EditError::NotACalculationStep { step_id: step_id.to_string() })
    }
}
