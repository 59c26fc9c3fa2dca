//! Form Structure Parser
//!
//! Persisted `steps` payloads come in two shapes:
//!
//! - **phases**: `{"phases": [{"id": "cotation", "name": ..., "steps": [...]}, ...]}`
//! - **legacy**: `{"step1": {"title": ..., "fields": [...]}, ...}`, or a bare
//!   array of `{title, fields}` from the flat-step editor
//!
//! The presence of a top-level `phases` array is the only discriminant.
//! Parsing never fails: anything unusable is dropped and reported as a
//! [`ParseWarning`], degrading to an empty two-phase structure at worst.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use super::{CalculationRuleBlock, Coefficient, FieldDefinition, FormStructure, Phase, SubStep, Tax};
use crate::domain::value_objects::{FieldType, PhaseId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    #[error("steps payload is a {found}, expected an object")]
    NotAnObject { found: &'static str },

    #[error("`phases` is present but is not an array")]
    PhasesNotArray,

    #[error("phase entry #{index} is not an object")]
    PhaseNotObject { index: usize },

    #[error("unknown phase '{id}' ignored")]
    UnknownPhase { id: String },

    #[error("phase '{phase}' declared more than once, later entry ignored")]
    DuplicatePhase { phase: PhaseId },

    #[error("steps of phase '{phase}' are not an array")]
    StepsNotArray { phase: PhaseId },

    #[error("step '{key}' skipped: {reason}")]
    StepSkipped { key: String, reason: String },

    #[error("{kind} #{index} of step '{step_id}' skipped: {reason}")]
    EntrySkipped {
        step_id: String,
        kind: &'static str,
        index: usize,
        reason: String,
    },

    #[error("duplicate field '{field_id}' in step '{step_id}' dropped")]
    DuplicateField { step_id: String, field_id: String },
}

/// Parser output with the diagnostics collected on the way
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStructure {
    pub structure: FormStructure,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedStructure {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Normalize a persisted payload; see [`parse_with_report`] for diagnostics
pub fn parse(value: &Value) -> FormStructure {
    parse_with_report(value).structure
}

pub fn parse_with_report(value: &Value) -> ParsedStructure {
    let mut parser = Parser::default();
    let structure = parser.parse_root(value);
    for warning in &parser.warnings {
        tracing::warn!("Form structure: {}", warning);
    }
    ParsedStructure {
        structure,
        warnings: parser.warnings,
    }
}

impl FormStructure {
    /// Parse a payload that may be absent altogether
    pub fn from_storage(value: Option<&Value>) -> ParsedStructure {
        parse_with_report(value.unwrap_or(&Value::Null))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn string_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Default)]
struct Parser {
    warnings: Vec<ParseWarning>,
}

impl Parser {
    fn parse_root(&mut self, value: &Value) -> FormStructure {
        match value {
            Value::Null => FormStructure::new(),
            Value::Object(map) => match map.get("phases") {
                Some(Value::Array(phases)) => self.parse_phases(phases),
                Some(_) => {
                    self.warnings.push(ParseWarning::PhasesNotArray);
                    FormStructure::new()
                }
                None => self.parse_legacy_map(map),
            },
            Value::Array(steps) => self.parse_legacy_list(steps),
            other => {
                self.warnings.push(ParseWarning::NotAnObject { found: json_kind(other) });
                FormStructure::new()
            }
        }
    }

    fn parse_phases(&mut self, entries: &[Value]) -> FormStructure {
        let mut slots: [Option<Phase>; 2] = [None, None];

        for (index, entry) in entries.iter().enumerate() {
            let Some(obj) = entry.as_object() else {
                self.warnings.push(ParseWarning::PhaseNotObject { index });
                continue;
            };
            let raw_id = string_of(obj.get("id")).unwrap_or_default();
            let Ok(id) = raw_id.parse::<PhaseId>() else {
                self.warnings.push(ParseWarning::UnknownPhase { id: raw_id });
                continue;
            };
            if slots[id.index()].is_some() {
                self.warnings.push(ParseWarning::DuplicatePhase { phase: id });
                continue;
            }

            let name = string_of(obj.get("name")).unwrap_or_else(|| id.default_name().to_string());
            let steps = match obj.get("steps") {
                None | Some(Value::Null) => vec![],
                Some(Value::Array(raw)) => raw
                    .iter()
                    .enumerate()
                    .filter_map(|(i, step)| self.parse_step(id, i, step))
                    .collect(),
                Some(_) => {
                    self.warnings.push(ParseWarning::StepsNotArray { phase: id });
                    vec![]
                }
            };
            slots[id.index()] = Some(Phase { id, name, steps });
        }

        let [cotation, souscription] = slots;
        FormStructure::from_phases(
            cotation.unwrap_or_else(|| Phase::empty(PhaseId::Cotation)),
            souscription.unwrap_or_else(|| Phase::empty(PhaseId::Souscription)),
        )
    }

    fn parse_step(&mut self, phase: PhaseId, index: usize, value: &Value) -> Option<SubStep> {
        let fallback_id = format!("{}_step_{}", phase, index + 1);
        let Some(obj) = value.as_object() else {
            self.warnings.push(ParseWarning::StepSkipped {
                key: fallback_id,
                reason: format!("expected an object, found a {}", json_kind(value)),
            });
            return None;
        };
        let id = string_of(obj.get("id")).unwrap_or(fallback_id);
        let title = string_of(obj.get("title")).unwrap_or_default();

        match obj.get("type").and_then(Value::as_str) {
            None | Some("fields") => {
                let fields = self.parse_fields(&id, obj.get("fields"));
                Some(SubStep::fields(id, title, fields))
            }
            Some("calculation_rules") => {
                let raw = obj.get("calculationRules").or_else(|| obj.get("calculation_rules"));
                let rules = self.parse_calculation(&id, raw);
                Some(SubStep::calculation(id, title, rules))
            }
            Some(other) => {
                self.warnings.push(ParseWarning::StepSkipped {
                    key: id,
                    reason: format!("unknown sub-step type '{}'", other),
                });
                None
            }
        }
    }

    /// Legacy step-map: every entry is a fields sub-step of the cotation phase
    fn parse_legacy_map(&mut self, map: &Map<String, Value>) -> FormStructure {
        let steps = map
            .iter()
            .filter_map(|(key, value)| self.parse_legacy_step(key.clone(), value))
            .collect();
        Self::legacy_structure(steps)
    }

    fn parse_legacy_list(&mut self, entries: &[Value]) -> FormStructure {
        let steps = entries
            .iter()
            .enumerate()
            .filter_map(|(i, value)| {
                let key = value
                    .get("id")
                    .and_then(|v| string_of(Some(v)))
                    .unwrap_or_else(|| format!("step{}", i + 1));
                self.parse_legacy_step(key, value)
            })
            .collect();
        Self::legacy_structure(steps)
    }

    fn parse_legacy_step(&mut self, key: String, value: &Value) -> Option<SubStep> {
        let Some(obj) = value.as_object() else {
            self.warnings.push(ParseWarning::StepSkipped {
                reason: format!("expected an object, found a {}", json_kind(value)),
                key,
            });
            return None;
        };
        let title = string_of(obj.get("title")).unwrap_or_else(|| key.clone());
        let fields = self.parse_fields(&key, obj.get("fields"));
        Some(SubStep::fields(key, title, fields))
    }

    fn legacy_structure(steps: Vec<SubStep>) -> FormStructure {
        let mut cotation = Phase::empty(PhaseId::Cotation);
        cotation.steps = steps;
        FormStructure::from_phases(cotation, Phase::empty(PhaseId::Souscription))
    }

    fn parse_fields(&mut self, step_id: &str, value: Option<&Value>) -> Vec<FieldDefinition> {
        let raw = match value {
            None | Some(Value::Null) => return vec![],
            Some(Value::Array(raw)) => raw,
            Some(other) => {
                self.warnings.push(ParseWarning::EntrySkipped {
                    step_id: step_id.to_string(),
                    kind: "fields",
                    index: 0,
                    reason: format!("expected an array, found a {}", json_kind(other)),
                });
                return vec![];
            }
        };

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(raw.len());
        for (index, entry) in raw.iter().enumerate() {
            let field = match self.parse_field(step_id, index, entry) {
                Ok(field) => field,
                Err(reason) => {
                    self.warnings.push(ParseWarning::EntrySkipped {
                        step_id: step_id.to_string(),
                        kind: "field",
                        index,
                        reason,
                    });
                    continue;
                }
            };
            if !seen.insert(field.id.clone()) {
                self.warnings.push(ParseWarning::DuplicateField {
                    step_id: step_id.to_string(),
                    field_id: field.id,
                });
                continue;
            }
            fields.push(field);
        }
        fields
    }

    fn parse_field(&self, step_id: &str, index: usize, value: &Value) -> Result<FieldDefinition, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected an object, found a {}", json_kind(value)))?;
        let raw_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing field type".to_string())?;
        let field_type = raw_type.parse::<FieldType>().map_err(|e| e.to_string())?;

        let id = string_of(obj.get("id")).unwrap_or_else(|| format!("{}_field_{}", step_id, index + 1));
        let label = string_of(obj.get("label")).unwrap_or_else(|| field_type.default_label().to_string());
        let required = obj.get("required").and_then(Value::as_bool).unwrap_or(false);
        let options = obj.get("options").and_then(Value::as_array).map(|opts| {
            opts.iter()
                .filter_map(|o| string_of(Some(o)))
                .collect::<Vec<_>>()
        });

        Ok(FieldDefinition {
            id,
            field_type,
            label,
            required,
            options,
        })
    }

    fn parse_calculation(&mut self, step_id: &str, value: Option<&Value>) -> CalculationRuleBlock {
        let obj = match value {
            None | Some(Value::Null) => return CalculationRuleBlock::default(),
            Some(Value::Object(obj)) => obj,
            Some(other) => {
                self.warnings.push(ParseWarning::EntrySkipped {
                    step_id: step_id.to_string(),
                    kind: "calculationRules",
                    index: 0,
                    reason: format!("expected an object, found a {}", json_kind(other)),
                });
                return CalculationRuleBlock::default();
            }
        };
        CalculationRuleBlock {
            base_formula: string_of(obj.get("baseFormula")).unwrap_or_default(),
            coefficients: self.parse_entries::<Coefficient>(step_id, "coefficient", obj.get("coefficients")),
            taxes: self.parse_entries::<Tax>(step_id, "tax", obj.get("taxes")),
        }
    }

    fn parse_entries<T: serde::de::DeserializeOwned>(
        &mut self,
        step_id: &str,
        kind: &'static str,
        value: Option<&Value>,
    ) -> Vec<T> {
        let Some(raw) = value.and_then(Value::as_array) else {
            return vec![];
        };
        raw.iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<T>(entry.clone()) {
                Ok(item) => Some(item),
                Err(e) => {
                    self.warnings.push(ParseWarning::EntrySkipped {
                        step_id: step_id.to_string(),
                        kind,
                        index,
                        reason: e.to_string(),
                    });
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn titles(s: &FormStructure, phase: PhaseId) -> Vec<&str> {
        s.phase(phase).steps.iter().map(|st| st.title.as_str()).collect()
    }

    #[test]
    fn test_null_and_empty_object_degrade_to_empty_structure() {
        for input in [Value::Null, json!({})] {
            let parsed = parse_with_report(&input);
            let s = &parsed.structure;
            assert_eq!(s.phases()[0].id, PhaseId::Cotation);
            assert_eq!(s.phases()[1].id, PhaseId::Souscription);
            assert!(s.is_empty());
            assert!(parsed.is_clean());
        }
    }

    #[test]
    fn test_non_object_calculation_block_is_reported() {
        let parsed = parse_with_report(&json!({"phases": [
            {"id": "cotation", "steps": [
                {"id": "tarif", "title": "Tarif", "type": "calculation_rules", "calculationRules": [1, 2]}
            ]}
        ]}));

        let step = parsed.structure.find_step("tarif").unwrap().1;
        assert_eq!(step.calculation_rules(), Some(&CalculationRuleBlock::default()));
        assert!(matches!(
            parsed.warnings.as_slice(),
            [ParseWarning::EntrySkipped { kind: "calculationRules", index: 0, .. }]
        ));
    }

    #[test]
    fn test_scalar_payload_is_reported() {
        let parsed = parse_with_report(&json!("oops"));
        assert!(parsed.structure.is_empty());
        assert_eq!(parsed.warnings, vec![ParseWarning::NotAnObject { found: "string" }]);
    }

    #[test]
    fn test_legacy_step_map() {
        let legacy = json!({
            "step1": {"title": "A", "fields": [
                {"id": "f1", "type": "text", "label": "Nom", "required": true},
                {"id": "f2", "type": "select", "label": "Usage", "options": ["Privé", "Pro"]}
            ]},
            "step2": {"title": "B", "fields": []}
        });
        let s = parse(&legacy);

        assert_eq!(s.phases()[0].id, PhaseId::Cotation);
        assert_eq!(titles(&s, PhaseId::Cotation), vec!["A", "B"]);
        assert!(s.phase(PhaseId::Souscription).steps.is_empty());

        let first = &s.phase(PhaseId::Cotation).steps[0];
        assert_eq!(first.id, "step1");
        let fields = first.field_list().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields[0].required);
        assert_eq!(fields[1].options.as_deref(), Some(&["Privé".to_string(), "Pro".to_string()][..]));
    }

    #[test]
    fn test_legacy_map_preserves_insertion_order() {
        let legacy: Value = serde_json::from_str(
            r#"{"zeta": {"title": "Z"}, "alpha": {"title": "A"}, "mid": {"title": "M"}}"#,
        )
        .unwrap();
        assert_eq!(titles(&parse(&legacy), PhaseId::Cotation), vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_legacy_list_from_flat_editor() {
        let legacy = json!([{"title": "Infos", "fields": [{"type": "email"}]}]);
        let s = parse(&legacy);
        let step = &s.phase(PhaseId::Cotation).steps[0];
        assert_eq!(step.id, "step1");
        let field = &step.field_list().unwrap()[0];
        assert_eq!(field.id, "step1_field_1");
        assert_eq!(field.label, "Email");
    }

    #[test]
    fn test_new_format_fills_missing_phase() {
        let payload = json!({"phases": [
            {"id": "souscription", "name": "Adhésion", "steps": [
                {"id": "s1", "title": "Identité", "type": "fields", "fields": []}
            ]}
        ]});
        let s = parse(&payload);
        assert_eq!(s.phases()[0].id, PhaseId::Cotation);
        assert!(s.phase(PhaseId::Cotation).steps.is_empty());
        assert_eq!(s.phase(PhaseId::Souscription).name, "Adhésion");
        assert_eq!(titles(&s, PhaseId::Souscription), vec!["Identité"]);
    }

    #[test]
    fn test_new_format_phase_order_is_fixed() {
        let payload = json!({"phases": [
            {"id": "souscription", "steps": []},
            {"id": "cotation", "steps": [{"id": "c1", "title": "Tarif", "type": "calculation_rules",
                "calculationRules": {"baseFormula": "prime * coef", "coefficients": [{"name": "coef", "value": 1.2}]}}]}
        ]});
        let s = parse(&payload);
        let order: Vec<_> = s.phases().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![PhaseId::Cotation, PhaseId::Souscription]);
        let block = s.phase(PhaseId::Cotation).steps[0].calculation_rules().unwrap();
        assert_eq!(block.base_formula, "prime * coef");
        assert_eq!(block.coefficients[0].value, rust_decimal::Decimal::new(12, 1));
    }

    #[test]
    fn test_type_discriminant_wins_over_stray_payload() {
        let payload = json!({"phases": [{"id": "cotation", "steps": [
            {"id": "s1", "title": "X", "type": "fields", "fields": [], "calculationRules": {"baseFormula": "a"}}
        ]}]});
        let s = parse(&payload);
        let step = &s.phase(PhaseId::Cotation).steps[0];
        assert!(step.is_fields());
        assert!(step.calculation_rules().is_none());
    }

    #[test]
    fn test_malformed_entries_are_dropped_with_warnings() {
        let payload = json!({"phases": [
            {"id": "cotation", "steps": [
                {"id": "s1", "title": "ok", "fields": [
                    {"id": "f1", "type": "text"},
                    {"id": "f2", "type": "hologram"},
                    {"id": "f1", "type": "number"},
                    42
                ]},
                {"id": "s2", "type": "wizard"},
                "junk"
            ]},
            {"id": "paiement", "steps": []},
            {"id": "cotation", "steps": []}
        ]});
        let parsed = parse_with_report(&payload);
        let steps = &parsed.structure.phase(PhaseId::Cotation).steps;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].field_list().unwrap().len(), 1);

        assert!(parsed.warnings.contains(&ParseWarning::DuplicateField {
            step_id: "s1".into(),
            field_id: "f1".into()
        }));
        assert!(parsed.warnings.contains(&ParseWarning::UnknownPhase { id: "paiement".into() }));
        assert!(parsed.warnings.contains(&ParseWarning::DuplicatePhase { phase: PhaseId::Cotation }));
        assert_eq!(
            parsed
                .warnings
                .iter()
                .filter(|w| matches!(w, ParseWarning::StepSkipped { .. }))
                .count(),
            2
        );
        assert_eq!(
            parsed
                .warnings
                .iter()
                .filter(|w| matches!(w, ParseWarning::EntrySkipped { kind: "field", .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_phases_not_an_array() {
        let parsed = parse_with_report(&json!({"phases": {"cotation": []}}));
        assert!(parsed.structure.is_empty());
        assert_eq!(parsed.warnings, vec![ParseWarning::PhasesNotArray]);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let payload = json!({"phases": [{"id": "cotation", "steps": [{"title": "sans id", "fields": [{"type": "date"}]}]}]});
        assert_eq!(parse(&payload), parse(&payload));
        assert_eq!(parse(&payload).phase(PhaseId::Cotation).steps[0].id, "cotation_step_1");
    }

    #[test]
    fn test_deserialize_goes_through_parser() {
        let s: FormStructure = serde_json::from_str(r#"{"step1": {"title": "A", "fields": []}}"#).unwrap();
        assert_eq!(titles(&s, PhaseId::Cotation), vec!["A"]);
    }

    #[test]
    fn test_absent_payload() {
        let parsed = FormStructure::from_storage(None);
        assert!(parsed.structure.is_empty());
        assert!(parsed.is_clean());
    }
}
