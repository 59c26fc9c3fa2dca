//! Product-Form Link Aggregate
//!
//! Associates a product with a form template for a distribution channel.

use chrono::{DateTime, Utc};

use crate::domain::events::{DomainEvent, LinkEvent};
use crate::domain::value_objects::{Channel, EntityId};

#[derive(Clone, Debug)]
pub struct ProductFormLink {
    id: EntityId,
    product_id: EntityId,
    form_template_id: EntityId,
    calc_rule_id: Option<EntityId>,
    channel: Channel,
    is_active: bool,
    display_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

/// Partial update of a link; `calc_rule_id: Some(None)` detaches the rule
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkPatch {
    pub channel: Option<Channel>,
    pub calc_rule_id: Option<Option<EntityId>>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ProductFormLink {
    pub fn create(
        product_id: EntityId,
        form_template_id: EntityId,
        channel: Channel,
        display_order: i32,
    ) -> Self {
        let now = Utc::now();
        let id = EntityId::new();

        let mut link = Self {
            id: id.clone(),
            product_id: product_id.clone(),
            form_template_id: form_template_id.clone(),
            calc_rule_id: None,
            channel,
            is_active: true,
            display_order,
            created_at: now,
            updated_at: now,
            events: vec![],
        };

        link.raise_event(DomainEvent::Link(LinkEvent::Linked {
            link_id: id,
            product_id,
            form_template_id,
            channel,
        }));

        link
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn product_id(&self) -> &EntityId { &self.product_id }
    pub fn form_template_id(&self) -> &EntityId { &self.form_template_id }
    pub fn calc_rule_id(&self) -> Option<&EntityId> { self.calc_rule_id.as_ref() }
    pub fn channel(&self) -> Channel { self.channel }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn display_order(&self) -> i32 { self.display_order }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Same (product, form template) pair
    pub fn same_pair(&self, other: &ProductFormLink) -> bool {
        self.product_id == other.product_id && self.form_template_id == other.form_template_id
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    pub fn set_channel(&mut self, channel: Channel) {
        self.channel = channel;
        self.touch();
    }

    pub fn set_calc_rule(&mut self, calc_rule_id: Option<EntityId>) {
        self.calc_rule_id = calc_rule_id;
        self.touch();
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.touch();
    }

    pub fn set_display_order(&mut self, order: i32) {
        self.display_order = order;
        self.touch();
    }

    /// Apply each present attribute independently
    pub fn apply(&mut self, patch: LinkPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(channel) = patch.channel {
            self.set_channel(channel);
        }
        if let Some(calc_rule_id) = patch.calc_rule_id {
            self.set_calc_rule(calc_rule_id);
        }
        if let Some(active) = patch.is_active {
            self.set_active(active);
        }
        if let Some(order) = patch.display_order {
            self.set_display_order(order);
        }
        self.raise_event(DomainEvent::Link(LinkEvent::Updated { link_id: self.id.clone() }));
    }

    /// Record removal; the caller deletes the row
    pub fn mark_unlinked(&mut self) {
        self.raise_event(DomainEvent::Link(LinkEvent::Unlinked {
            link_id: self.id.clone(),
            product_id: self.product_id.clone(),
            form_template_id: self.form_template_id.clone(),
        }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

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

    fn create_test_link() -> ProductFormLink {
        ProductFormLink::create(
            EntityId::from_string("prod-auto"),
            EntityId::from_string("tpl-auto"),
            Channel::B2c,
            0,
        )
    }

    #[test]
    fn test_link_creation() {
        let mut link = create_test_link();
        assert!(link.is_active());
        assert_eq!(link.channel(), Channel::B2c);
        assert!(link.calc_rule_id().is_none());
        assert!(matches!(
            link.take_events().as_slice(),
            [DomainEvent::Link(LinkEvent::Linked { channel: Channel::B2c, .. })]
        ));
    }

    #[test]
    fn test_patch_updates_attributes_independently() {
        let mut link = create_test_link();
        link.take_events();

        link.apply(LinkPatch { calc_rule_id: Some(Some(EntityId::from_string("rule-1"))), ..Default::default() });
        assert_eq!(link.calc_rule_id().map(EntityId::as_str), Some("rule-1"));
        assert_eq!(link.channel(), Channel::B2c);
        assert!(link.is_active());

        link.apply(LinkPatch { is_active: Some(false), display_order: Some(3), ..Default::default() });
        assert!(!link.is_active());
        assert_eq!(link.display_order(), 3);
        assert_eq!(link.calc_rule_id().map(EntityId::as_str), Some("rule-1"));

        link.apply(LinkPatch { calc_rule_id: Some(None), ..Default::default() });
        assert!(link.calc_rule_id().is_none());
        assert_eq!(link.take_events().len(), 3);
    }

    #[test]
    fn test_empty_patch_raises_nothing() {
        let mut link = create_test_link();
        link.take_events();
        link.apply(LinkPatch::default());
        assert!(link.take_events().is_empty());
    }

    #[test]
    fn test_same_pair() {
        let a = create_test_link();
        let b = create_test_link();
        assert_ne!(a.id(), b.id());
        assert!(a.same_pair(&b));
    }
}
