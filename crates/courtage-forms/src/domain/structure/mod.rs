//! Form Structure Model
//!
//! The schema of a product subscription/quotation form: two fixed phases,
//! each an ordered list of sub-steps, each sub-step holding either input
//! fields or one premium calculation block.
//!
//! - [`parser`] turns persisted JSON of either shape into a [`FormStructure`]
//! - [`editor`] holds the mutation operations used by the form builder
//! - [`serializer`] writes a structure back to a storage shape

pub mod calculation;
pub mod editor;
pub mod parser;
pub mod serializer;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{FieldType, PhaseId};

pub use calculation::{CalculationRuleBlock, Coefficient, Tax, TaxKind};
pub use editor::{EditError, IntoPhaseId};
pub use parser::{ParseWarning, ParsedStructure};
pub use serializer::{LegacyIncompatibility, LegacyStep, SerializeError, StorageFormat};

// =============================================================================
// Field Definition
// =============================================================================

/// A single input of a fields sub-step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FieldDefinition {
    /// Field as added from the field library: default label, optional,
    /// and two placeholder options for choice types.
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        let options = field_type.is_choice().then(placeholder_options);
        Self {
            id: id.into(),
            field_type,
            label: field_type.default_label().to_string(),
            required: false,
            options,
        }
    }

    /// Merge a partial update; the id is never touched
    pub fn apply(&mut self, patch: FieldPatch) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(field_type) = patch.field_type {
            self.field_type = field_type;
            // options only belong to choice types
            if !field_type.is_choice() {
                self.options = None;
            } else if self.options.is_none() {
                self.options = Some(placeholder_options());
            }
        }
        if let Some(required) = patch.required {
            self.required = required;
        }
        if let Some(options) = patch.options {
            self.options = if options.is_empty() { None } else { Some(options) };
        }
    }
}

fn placeholder_options() -> Vec<String> {
    vec!["Option 1".to_string(), "Option 2".to_string()]
}

/// Partial update of a field definition. `options: Some(vec![])` clears the list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FieldPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self { label: Some(label.into()), ..Self::default() }
    }

    pub fn required(required: bool) -> Self {
        Self { required: Some(required), ..Self::default() }
    }

    pub fn options<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { options: Some(options.into_iter().map(Into::into).collect()), ..Self::default() }
    }
}

// =============================================================================
// Sub-Step
// =============================================================================

/// A named unit inside a phase
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubStep {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub content: StepContent,
}

/// Payload of a sub-step, discriminated by `type` in storage
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepContent {
    Fields {
        fields: Vec<FieldDefinition>,
    },
    CalculationRules {
        #[serde(rename = "calculationRules")]
        calculation_rules: CalculationRuleBlock,
    },
}

impl StepContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fields { .. } => "fields",
            Self::CalculationRules { .. } => "calculation_rules",
        }
    }
}

impl SubStep {
    pub fn fields(id: impl Into<String>, title: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: StepContent::Fields { fields },
        }
    }

    pub fn calculation(id: impl Into<String>, title: impl Into<String>, rules: CalculationRuleBlock) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: StepContent::CalculationRules { calculation_rules: rules },
        }
    }

    pub fn is_fields(&self) -> bool {
        matches!(self.content, StepContent::Fields { .. })
    }

    /// Field list, `None` for a calculation sub-step
    pub fn field_list(&self) -> Option<&[FieldDefinition]> {
        match &self.content {
            StepContent::Fields { fields } => Some(fields),
            StepContent::CalculationRules { .. } => None,
        }
    }

    pub(crate) fn field_list_mut(&mut self) -> Option<&mut Vec<FieldDefinition>> {
        match &mut self.content {
            StepContent::Fields { fields } => Some(fields),
            StepContent::CalculationRules { .. } => None,
        }
    }

    pub fn calculation_rules(&self) -> Option<&CalculationRuleBlock> {
        match &self.content {
            StepContent::CalculationRules { calculation_rules } => Some(calculation_rules),
            StepContent::Fields { .. } => None,
        }
    }

    pub(crate) fn calculation_rules_mut(&mut self) -> Option<&mut CalculationRuleBlock> {
        match &mut self.content {
            StepContent::CalculationRules { calculation_rules } => Some(calculation_rules),
            StepContent::Fields { .. } => None,
        }
    }
}

// =============================================================================
// Phase
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Phase {
    pub id: PhaseId,
    pub name: String,
    pub steps: Vec<SubStep>,
}

impl Phase {
    pub fn empty(id: PhaseId) -> Self {
        Self {
            id,
            name: id.default_name().to_string(),
            steps: vec![],
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&SubStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

// =============================================================================
// Form Structure
// =============================================================================

/// Full schema of a form template.
///
/// Always holds exactly the `cotation` and `souscription` phases, in that
/// order. Construction goes through [`FormStructure::new`] or the parser.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormStructure {
    phases: [Phase; 2],
}

impl Default for FormStructure {
    fn default() -> Self {
        Self::new()
    }
}

impl FormStructure {
    /// Two empty phases
    pub fn new() -> Self {
        Self {
            phases: PhaseId::ALL.map(Phase::empty),
        }
    }

    pub(crate) fn from_phases(cotation: Phase, souscription: Phase) -> Self {
        debug_assert_eq!(cotation.id, PhaseId::Cotation);
        debug_assert_eq!(souscription.id, PhaseId::Souscription);
        Self {
            phases: [cotation, souscription],
        }
    }

    pub fn phases(&self) -> &[Phase; 2] {
        &self.phases
    }

    pub fn phase(&self, id: PhaseId) -> &Phase {
        &self.phases[id.index()]
    }

    pub(crate) fn phase_mut(&mut self, id: PhaseId) -> &mut Phase {
        &mut self.phases[id.index()]
    }

    /// Every sub-step with its phase, in display order
    pub fn steps(&self) -> impl Iterator<Item = (PhaseId, &SubStep)> {
        self.phases
            .iter()
            .flat_map(|p| p.steps.iter().map(move |s| (p.id, s)))
    }

    /// Every field with its owning sub-step id, in display order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.steps().flat_map(|(_, s)| {
            s.field_list()
                .unwrap_or_default()
                .iter()
                .map(move |f| (s.id.as_str(), f))
        })
    }

    pub fn find_step(&self, step_id: &str) -> Option<(PhaseId, &SubStep)> {
        self.steps().find(|(_, s)| s.id == step_id)
    }

    pub fn find_field(&self, field_id: &str) -> Option<&FieldDefinition> {
        self.fields().map(|(_, f)| f).find(|f| f.id == field_id)
    }

    pub fn field_ids(&self) -> Vec<&str> {
        self.fields().map(|(_, f)| f.id.as_str()).collect()
    }

    pub fn step_count(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }

    /// No sub-step in either phase ("no steps configured")
    pub fn is_empty(&self) -> bool {
        self.step_count() == 0
    }
}

impl<'de> Deserialize<'de> for FormStructure {
    /// Lenient: accepts either storage shape, never fails on content
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(parser::parse(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_structure_has_two_fixed_phases() {
        let s = FormStructure::new();
        assert_eq!(s.phases()[0].id, PhaseId::Cotation);
        assert_eq!(s.phases()[1].id, PhaseId::Souscription);
        assert!(s.is_empty());
    }

    #[test]
    fn test_type_change_keeps_options_consistent() {
        let mut field = FieldDefinition::new("field_usage", FieldType::Select);
        field.apply(FieldPatch { field_type: Some(FieldType::Text), ..FieldPatch::default() });
        assert_eq!(field.field_type, FieldType::Text);
        assert!(field.options.is_none());

        field.apply(FieldPatch { field_type: Some(FieldType::Radio), ..FieldPatch::default() });
        assert_eq!(field.options.as_ref().map(Vec::len), Some(2));

        field.apply(FieldPatch {
            field_type: Some(FieldType::Checkbox),
            options: Some(vec!["A".into()]),
            ..FieldPatch::default()
        });
        assert_eq!(field.options, Some(vec!["A".to_string()]));
    }

    #[test]
    fn test_new_choice_field_gets_placeholder_options() {
        let f = FieldDefinition::new("f1", FieldType::Radio);
        assert_eq!(f.label, "Choix unique");
        assert_eq!(f.options.as_ref().map(Vec::len), Some(2));
        assert!(FieldDefinition::new("f2", FieldType::Date).options.is_none());
    }

    #[test]
    fn test_patch_merges_only_given_attributes() {
        let mut f = FieldDefinition::new("f1", FieldType::Text);
        f.apply(FieldPatch::required(true));
        assert!(f.required);
        assert_eq!(f.label, "Champ texte");

        f.apply(FieldPatch::label("Nom"));
        assert_eq!(f.label, "Nom");
        assert!(f.required);
        assert_eq!(f.id, "f1");
    }

    #[test]
    fn test_patch_with_empty_options_clears_them() {
        let mut f = FieldDefinition::new("f1", FieldType::Select);
        f.apply(FieldPatch::options(Vec::<String>::new()));
        assert!(f.options.is_none());
    }

    #[test]
    fn test_sub_step_serializes_with_type_tag() {
        let step = SubStep::fields("s1", "Véhicule", vec![FieldDefinition::new("f1", FieldType::Number)]);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "fields");
        assert_eq!(json["fields"][0]["type"], "number");
        assert!(json.get("calculationRules").is_none());

        let calc = SubStep::calculation("s2", "Tarif", CalculationRuleBlock::default());
        let json = serde_json::to_value(&calc).unwrap();
        assert_eq!(json["type"], "calculation_rules");
        assert!(json.get("fields").is_none());
        assert!(json["calculationRules"].is_object());
    }

    #[test]
    fn test_lookup_across_phases() {
        let mut s = FormStructure::new();
        s.phase_mut(PhaseId::Souscription).steps.push(SubStep::fields(
            "identite",
            "Identité",
            vec![FieldDefinition::new("nom", FieldType::Text)],
        ));
        assert_eq!(s.find_step("identite").map(|(p, _)| p), Some(PhaseId::Souscription));
        assert!(s.find_field("nom").is_some());
        assert_eq!(s.field_ids(), vec!["nom"]);
        assert_eq!(s.field_count(), 1);
    }
}
