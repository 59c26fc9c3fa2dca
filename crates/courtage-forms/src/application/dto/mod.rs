//! Data Transfer Objects (DTOs)
//!
//! Objects for transferring data across boundaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{FormTemplate, TemplateMetadata};
use crate::domain::structure::{FormStructure, ParseWarning};
use crate::domain::value_objects::{Channel, EntityId, FormCategory};

// =============================================================================
// Form Template Commands
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateFormTemplateCommand {
    #[serde(flatten)]
    pub metadata: TemplateMetadata,
    #[serde(default)]
    pub structure: FormStructure,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateFormTemplateCommand {
    pub template_id: EntityId,
    pub metadata: Option<TemplateMetadata>,
    pub structure: Option<FormStructure>,
    pub is_active: Option<bool>,
}

/// Upsert: creates when `template_id` is absent, updates otherwise
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveFormTemplateCommand {
    pub template_id: Option<EntityId>,
    #[serde(flatten)]
    pub metadata: TemplateMetadata,
    pub structure: FormStructure,
}

// =============================================================================
// Link Commands
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkCommand {
    pub product_id: EntityId,
    pub form_template_id: EntityId,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub display_order: i32,
}

// =============================================================================
// Views
// =============================================================================

/// A template as loaded from storage, with the diagnostics of parsing its steps
#[derive(Clone, Debug)]
pub struct LoadedTemplate {
    pub template: FormTemplate,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: EntityId,
    pub name: String,
    pub category: FormCategory,
    pub product_type: String,
    pub is_active: bool,
    pub step_count: usize,
    pub field_count: usize,
}

impl From<&FormTemplate> for TemplateSummary {
    fn from(template: &FormTemplate) -> Self {
        Self {
            id: template.id().clone(),
            name: template.name().to_string(),
            category: template.category(),
            product_type: template.product_type().to_string(),
            is_active: template.is_active(),
            step_count: template.structure().step_count(),
            field_count: template.structure().field_count(),
        }
    }
}

/// A reference from a link that no longer resolves
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OrphanedReference {
    Product(EntityId),
    FormTemplate(EntityId),
    CalcRule(EntityId),
}

impl fmt::Display for OrphanedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product(id) => write!(f, "product {} no longer exists", id),
            Self::FormTemplate(id) => write!(f, "form template {} no longer exists", id),
            Self::CalcRule(id) => write!(f, "calculation rule {} no longer exists", id),
        }
    }
}

/// Link listing row with resolved names
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkView {
    pub link_id: EntityId,
    pub product_id: EntityId,
    pub product_name: String,
    pub form_template_id: EntityId,
    pub form_template_name: String,
    pub calc_rule_id: Option<EntityId>,
    pub calc_rule_name: Option<String>,
    pub channel: Channel,
    pub is_active: bool,
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<OrphanedReference>,
}

impl LinkView {
    pub fn is_orphaned(&self) -> bool {
        !self.orphans.is_empty()
    }
}
