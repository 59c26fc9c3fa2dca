//! Form Template Aggregate
//!
//! A named, persisted form structure that products link to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::{DomainEvent, FormTemplateEvent};
use crate::domain::structure::FormStructure;
use crate::domain::value_objects::{Channel, EntityId, FormCategory};

/// Descriptive attributes of a template, edited independently of its structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: FormCategory,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub target_channels: Vec<Channel>,
}

impl TemplateMetadata {
    pub fn new(name: impl Into<String>, category: FormCategory, product_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            category,
            product_type: product_type.into(),
            target_channels: vec![Channel::Both],
        }
    }
}

/// Form template aggregate root
#[derive(Clone, Debug)]
pub struct FormTemplate {
    id: EntityId,
    metadata: TemplateMetadata,
    structure: FormStructure,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl FormTemplate {
    /// New template under an id handed out by storage
    pub fn create(id: EntityId, metadata: TemplateMetadata, structure: FormStructure) -> Self {
        let now = Utc::now();
        let mut template = Self {
            id: id.clone(),
            metadata,
            structure,
            is_active: true,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        template.raise_event(DomainEvent::FormTemplate(FormTemplateEvent::Created {
            template_id: id,
            name: template.metadata.name.clone(),
            created_at: now,
        }));
        template
    }

    /// Rebuild from storage; raises no events
    pub fn restore(
        id: EntityId,
        metadata: TemplateMetadata,
        structure: FormStructure,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            metadata,
            structure,
            is_active,
            created_at,
            updated_at,
            events: vec![],
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn metadata(&self) -> &TemplateMetadata { &self.metadata }
    pub fn name(&self) -> &str { &self.metadata.name }
    pub fn category(&self) -> FormCategory { self.metadata.category }
    pub fn product_type(&self) -> &str { &self.metadata.product_type }
    pub fn structure(&self) -> &FormStructure { &self.structure }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Metadata match used when suggesting templates for a product
    pub fn matches(&self, category: FormCategory, product_type: &str) -> bool {
        self.metadata.category == category && self.metadata.product_type.eq_ignore_ascii_case(product_type)
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    pub fn update_metadata(&mut self, metadata: TemplateMetadata) {
        self.metadata = metadata;
        self.touch();
    }

    pub fn replace_structure(&mut self, structure: FormStructure) {
        self.raise_event(DomainEvent::FormTemplate(FormTemplateEvent::StructureChanged {
            template_id: self.id.clone(),
            step_count: structure.step_count(),
            field_count: structure.field_count(),
        }));
        self.structure = structure;
        self.touch();
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    /// Copy of this template under `copy_id`; structure ids are kept as-is
    pub fn duplicate(&self, copy_id: EntityId, name: impl Into<String>) -> FormTemplate {
        let mut metadata = self.metadata.clone();
        metadata.name = name.into();
        let mut copy = FormTemplate::create(copy_id.clone(), metadata, self.structure.clone());
        copy.raise_event(DomainEvent::FormTemplate(FormTemplateEvent::Duplicated {
            source_id: self.id.clone(),
            copy_id,
        }));
        copy
    }

    /// Record removal; the caller deletes the row
    pub fn mark_deleted(&mut self) {
        self.raise_event(DomainEvent::FormTemplate(FormTemplateEvent::Deleted {
            template_id: self.id.clone(),
        }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Private
    // =========================================================================

    fn raise_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::FieldType;

    fn create_test_template() -> FormTemplate {
        let mut structure = FormStructure::new();
        let step = structure.add_step("cotation", "Véhicule").unwrap();
        structure.add_field("cotation", &step, FieldType::Currency).unwrap();
        FormTemplate::create(
            EntityId::from_string("tpl-auto"),
            TemplateMetadata::new("Auto - cotation", FormCategory::NonVie, "auto"),
            structure,
        )
    }

    #[test]
    fn test_template_creation() {
        let mut template = create_test_template();
        assert!(template.is_active());
        assert_eq!(template.name(), "Auto - cotation");

        let events = template.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "form_template.created");
        assert!(template.take_events().is_empty());
    }

    #[test]
    fn test_duplicate_copies_structure_under_new_id() {
        let template = create_test_template();
        let mut copy = template.duplicate(EntityId::from_string("tpl-copy"), "Auto - cotation (copie)");

        assert_eq!(copy.id().as_str(), "tpl-copy");
        assert_eq!(copy.structure(), template.structure());
        assert_eq!(copy.product_type(), "auto");

        let names: Vec<_> = copy.take_events().iter().map(DomainEvent::name).collect();
        assert_eq!(names, vec!["form_template.created", "form_template.duplicated"]);
    }

    #[test]
    fn test_replace_structure_raises_event() {
        let mut template = create_test_template();
        template.take_events();
        template.replace_structure(FormStructure::new());
        assert!(template.structure().is_empty());
        assert!(matches!(
            template.take_events().as_slice(),
            [DomainEvent::FormTemplate(FormTemplateEvent::StructureChanged { step_count: 0, .. })]
        ));
    }

    #[test]
    fn test_metadata_match_ignores_product_type_case() {
        let template = create_test_template();
        assert!(template.matches(FormCategory::NonVie, "AUTO"));
        assert!(!template.matches(FormCategory::Vie, "auto"));
        assert!(!template.matches(FormCategory::NonVie, "habitation"));
    }
}
