//! Structure consistency checks
//!
//! The editor keeps a structure well-formed operation by operation; this
//! service looks at the whole picture before it is persisted or linked.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::domain::structure::{CalculationRuleBlock, FormStructure, StepContent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationIssue {
    DuplicateFieldId { field_id: String, occurrences: usize },
    DuplicateStepId { step_id: String, occurrences: usize },
    DuplicateCoefficient { step_id: String, name: String },
    DuplicateTax { step_id: String, name: String },
    NoSteps,
    EmptyStepTitle { step_id: String },
    EmptyFieldLabel { field_id: String },
    ChoiceWithoutOptions { field_id: String },
    OptionsOnNonChoice { field_id: String },
    EmptyFormula { step_id: String },
    UnknownFormulaVariable { step_id: String, variable: String },
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateFieldId { .. }
            | Self::DuplicateStepId { .. }
            | Self::DuplicateCoefficient { .. }
            | Self::DuplicateTax { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFieldId { field_id, occurrences } => {
                write!(f, "field id '{}' used {} times", field_id, occurrences)
            }
            Self::DuplicateStepId { step_id, occurrences } => {
                write!(f, "sub-step id '{}' used {} times", step_id, occurrences)
            }
            Self::DuplicateCoefficient { step_id, name } => {
                write!(f, "coefficient '{}' declared twice in '{}'", name, step_id)
            }
            Self::DuplicateTax { step_id, name } => write!(f, "tax '{}' declared twice in '{}'", name, step_id),
            Self::NoSteps => write!(f, "no steps configured"),
            Self::EmptyStepTitle { step_id } => write!(f, "sub-step '{}' has no title", step_id),
            Self::EmptyFieldLabel { field_id } => write!(f, "field '{}' has no label", field_id),
            Self::ChoiceWithoutOptions { field_id } => write!(f, "choice field '{}' has no options", field_id),
            Self::OptionsOnNonChoice { field_id } => {
                write!(f, "field '{}' has options but is not a choice field", field_id)
            }
            Self::EmptyFormula { step_id } => write!(f, "calculation '{}' has no base formula", step_id),
            Self::UnknownFormulaVariable { step_id, variable } => {
                write!(f, "formula of '{}' reads unknown variable '{}'", step_id, variable)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// No error-severity issue
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity() == Severity::Warning)
    }
}

/// Whole-structure validation service
pub struct StructureValidator;

impl StructureValidator {
    pub fn validate(structure: &FormStructure) -> ValidationReport {
        let mut issues = Vec::new();

        if structure.is_empty() {
            issues.push(ValidationIssue::NoSteps);
        }

        for (step_id, occurrences) in Self::duplicates(structure.steps().map(|(_, s)| s.id.as_str())) {
            issues.push(ValidationIssue::DuplicateStepId { step_id, occurrences });
        }
        for (field_id, occurrences) in Self::duplicates(structure.fields().map(|(_, f)| f.id.as_str())) {
            issues.push(ValidationIssue::DuplicateFieldId { field_id, occurrences });
        }

        let known: HashSet<&str> = structure.field_ids().into_iter().collect();

        for (_, step) in structure.steps() {
            if step.title.trim().is_empty() {
                issues.push(ValidationIssue::EmptyStepTitle { step_id: step.id.clone() });
            }
            match &step.content {
                StepContent::Fields { fields } => {
                    for field in fields {
                        let has_options = field.options.as_ref().is_some_and(|o| !o.is_empty());
                        if field.label.trim().is_empty() {
                            issues.push(ValidationIssue::EmptyFieldLabel { field_id: field.id.clone() });
                        }
                        if field.field_type.is_choice() && !has_options {
                            issues.push(ValidationIssue::ChoiceWithoutOptions { field_id: field.id.clone() });
                        }
                        if !field.field_type.is_choice() && has_options {
                            issues.push(ValidationIssue::OptionsOnNonChoice { field_id: field.id.clone() });
                        }
                    }
                }
                StepContent::CalculationRules { calculation_rules } => {
                    Self::check_calculation(&step.id, calculation_rules, &known, &mut issues);
                }
            }
        }

        ValidationReport { issues }
    }

    fn check_calculation(
        step_id: &str,
        rules: &CalculationRuleBlock,
        known_fields: &HashSet<&str>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (name, _) in Self::duplicates(rules.coefficients.iter().map(|c| c.name.as_str())) {
            issues.push(ValidationIssue::DuplicateCoefficient { step_id: step_id.to_string(), name });
        }
        for (name, _) in Self::duplicates(rules.taxes.iter().map(|t| t.name.as_str())) {
            issues.push(ValidationIssue::DuplicateTax { step_id: step_id.to_string(), name });
        }

        if rules.base_formula.trim().is_empty() {
            issues.push(ValidationIssue::EmptyFormula { step_id: step_id.to_string() });
            return;
        }
        for variable in rules.referenced_variables() {
            let is_coefficient = rules.coefficient(&variable).is_some();
            if !is_coefficient && !known_fields.contains(variable.as_str()) {
                issues.push(ValidationIssue::UnknownFormulaVariable {
                    step_id: step_id.to_string(),
                    variable,
                });
            }
        }
    }

    /// Values seen more than once, in order of first appearance
    fn duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
        let mut order = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for id in ids {
            let count = counts.entry(id).or_insert(0);
            if *count == 0 {
                order.push(id);
            }
            *count += 1;
        }
        order
            .into_iter()
            .filter_map(|id| {
                let n = counts[id];
                (n > 1).then(|| (id.to_string(), n))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::structure::parser::parse;
    use crate::domain::structure::FieldPatch;
    use crate::domain::value_objects::FieldType;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_empty_structure_only_warns() {
        let report = StructureValidator::validate(&FormStructure::new());
        assert_eq!(report.issues, vec![ValidationIssue::NoSteps]);
        assert!(report.is_valid());
    }

    #[test]
    fn test_editor_built_structure_is_clean() {
        let mut s = FormStructure::new();
        let step = s.add_step("cotation", "Véhicule").unwrap();
        s.add_field("cotation", &step, FieldType::Number).unwrap();
        s.add_field("cotation", &step, FieldType::Select).unwrap();
        let report = StructureValidator::validate(&s);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn test_field_id_collision_across_phases_is_an_error() {
        let payload = json!({"phases": [
            {"id": "cotation", "steps": [{"id": "a", "title": "A", "fields": [{"id": "email", "type": "email"}]}]},
            {"id": "souscription", "steps": [{"id": "b", "title": "B", "fields": [{"id": "email", "type": "email"}]}]}
        ]});
        let report = StructureValidator::validate(&parse(&payload));
        assert!(!report.is_valid());
        assert_eq!(
            report.errors().collect::<Vec<_>>(),
            vec![&ValidationIssue::DuplicateFieldId { field_id: "email".into(), occurrences: 2 }]
        );
    }

    #[test]
    fn test_step_id_collision_is_an_error() {
        let payload = json!({"phases": [
            {"id": "cotation", "steps": [{"id": "x", "title": "A"}]},
            {"id": "souscription", "steps": [{"id": "x", "title": "B"}]}
        ]});
        let report = StructureValidator::validate(&parse(&payload));
        assert!(report
            .issues
            .contains(&ValidationIssue::DuplicateStepId { step_id: "x".into(), occurrences: 2 }));
    }

    #[test]
    fn test_field_warnings() {
        let mut s = FormStructure::new();
        let step = s.add_step("cotation", " ").unwrap();
        let choice = s.add_field("cotation", &step, FieldType::Radio).unwrap();
        let text = s.add_field("cotation", &step, FieldType::Text).unwrap();
        s.update_field(&choice, FieldPatch::options(Vec::<String>::new())).unwrap();
        s.update_field(&text, FieldPatch { label: Some(String::new()), options: Some(vec!["a".into()]), ..Default::default() })
            .unwrap();

        let report = StructureValidator::validate(&s);
        assert!(report.is_valid());
        assert!(report.issues.contains(&ValidationIssue::EmptyStepTitle { step_id: step }));
        assert!(report.issues.contains(&ValidationIssue::ChoiceWithoutOptions { field_id: choice }));
        assert!(report.issues.contains(&ValidationIssue::EmptyFieldLabel { field_id: text.clone() }));
        assert!(report.issues.contains(&ValidationIssue::OptionsOnNonChoice { field_id: text }));
    }

    #[test]
    fn test_formula_checks() {
        let mut s = FormStructure::new();
        let step = s.add_step("cotation", "Véhicule").unwrap();
        let valeur = s.add_field("cotation", &step, FieldType::Currency).unwrap();
        let calc = s.add_calculation_step("cotation", "Tarif").unwrap();

        let report = StructureValidator::validate(&s);
        assert!(report.issues.contains(&ValidationIssue::EmptyFormula { step_id: calc.clone() }));

        let rules = s.calculation_rules_mut(&calc).unwrap();
        rules.set_base_formula(format!("{} * taux * zone", valeur));
        rules.add_coefficient("taux", Decimal::new(4, 2)).unwrap();

        let report = StructureValidator::validate(&s);
        assert_eq!(
            report.warnings().collect::<Vec<_>>(),
            vec![&ValidationIssue::UnknownFormulaVariable { step_id: calc, variable: "zone".into() }]
        );
    }

    #[test]
    fn test_duplicate_coefficients_from_storage() {
        let payload = json!({"phases": [{"id": "cotation", "steps": [{"id": "t", "title": "Tarif", "type": "calculation_rules",
            "calculationRules": {"baseFormula": "k", "coefficients": [{"name": "k", "value": 1}, {"name": "k", "value": 2}]}}]}]});
        let report = StructureValidator::validate(&parse(&payload));
        assert!(report
            .errors()
            .any(|i| *i == ValidationIssue::DuplicateCoefficient { step_id: "t".into(), name: "k".into() }));
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::DuplicateFieldId { field_id: "nom".into(), occurrences: 3 };
        assert_eq!(issue.to_string(), "field id 'nom' used 3 times");
        assert_eq!(issue.severity(), Severity::Error);
    }
}
