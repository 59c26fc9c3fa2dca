//! Domain Events
//!
//! Events raised by aggregates to communicate state changes.

use chrono::{DateTime, Utc};

use crate::domain::value_objects::{Channel, EntityId};

/// All domain events in the forms bounded context
#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    FormTemplate(FormTemplateEvent),
    Link(LinkEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormTemplateEvent {
    Created {
        template_id: EntityId,
        name: String,
        created_at: DateTime<Utc>,
    },
    StructureChanged {
        template_id: EntityId,
        step_count: usize,
        field_count: usize,
    },
    Duplicated {
        source_id: EntityId,
        copy_id: EntityId,
    },
    Deleted {
        template_id: EntityId,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LinkEvent {
    Linked {
        link_id: EntityId,
        product_id: EntityId,
        form_template_id: EntityId,
        channel: Channel,
    },
    Updated {
        link_id: EntityId,
    },
    Unlinked {
        link_id: EntityId,
        product_id: EntityId,
        form_template_id: EntityId,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FormTemplate(FormTemplateEvent::Created { .. }) => "form_template.created",
            Self::FormTemplate(FormTemplateEvent::StructureChanged { .. }) => "form_template.structure_changed",
            Self::FormTemplate(FormTemplateEvent::Duplicated { .. }) => "form_template.duplicated",
            Self::FormTemplate(FormTemplateEvent::Deleted { .. }) => "form_template.deleted",
            Self::Link(LinkEvent::Linked { .. }) => "product_form_link.linked",
            Self::Link(LinkEvent::Updated { .. }) => "product_form_link.updated",
            Self::Link(LinkEvent::Unlinked { .. }) => "product_form_link.unlinked",
        }
    }
}
