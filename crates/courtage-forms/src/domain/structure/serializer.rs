//! Serialization back to the persisted `steps` shape
//!
//! Two targets exist because storage moved from a flat step-map to the
//! phase/sub-step layout. Only the phases target is lossless for every
//! structure; the legacy target accepts fields-only cotation structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{FieldDefinition, FormStructure, StepContent};
use crate::domain::value_objects::PhaseId;

/// Target shape for persisted structures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    #[default]
    Phases,
    Legacy,
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phases => f.write_str("phases"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for StorageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phases" => Ok(Self::Phases),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown storage format: {}", other)),
        }
    }
}

/// One step of the flat-step editor state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyStep {
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyIncompatibility {
    CalculationStep { step_id: String },
    SouscriptionSteps { count: usize },
}

impl fmt::Display for LegacyIncompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CalculationStep { step_id } => write!(f, "sub-step '{}' holds calculation rules", step_id),
            Self::SouscriptionSteps { count } => write!(f, "souscription phase has {} sub-step(s)", count),
        }
    }
}

#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("structure cannot be stored in the legacy format: {0}")]
    NotLegacyCompatible(LegacyIncompatibility),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// `{"step1": {title, fields}, "step2": ...}` in list order
pub fn legacy_steps_to_storage(steps: &[LegacyStep]) -> Result<Value, SerializeError> {
    let mut map = Map::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        map.insert(format!("step{}", i + 1), serde_json::to_value(step)?);
    }
    Ok(Value::Object(map))
}

impl FormStructure {
    pub fn to_storage(&self, format: StorageFormat) -> Result<Value, SerializeError> {
        match format {
            StorageFormat::Phases => Ok(serde_json::to_value(self)?),
            StorageFormat::Legacy => legacy_steps_to_storage(&self.to_legacy_steps()?),
        }
    }

    /// Flat-step view of a fields-only structure living in `cotation`
    pub fn to_legacy_steps(&self) -> Result<Vec<LegacyStep>, SerializeError> {
        let souscription = self.phase(PhaseId::Souscription).steps.len();
        if souscription > 0 {
            return Err(SerializeError::NotLegacyCompatible(
                LegacyIncompatibility::SouscriptionSteps { count: souscription },
            ));
        }

        self.phase(PhaseId::Cotation)
            .steps
            .iter()
            .map(|step| match &step.content {
                StepContent::Fields { fields } => Ok(LegacyStep {
                    title: step.title.clone(),
                    fields: fields.clone(),
                }),
                StepContent::CalculationRules { .. } => Err(SerializeError::NotLegacyCompatible(
                    LegacyIncompatibility::CalculationStep { step_id: step.id.clone() },
                )),
            })
            .collect()
    }

    /// Whether [`StorageFormat::Legacy`] can hold this structure
    pub fn is_legacy_compatible(&self) -> bool {
        self.to_legacy_steps().is_ok()
    }
}
