//! In-memory adapters for testing and local tooling

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::aggregates::ProductFormLink;
use crate::domain::value_objects::EntityId;
use crate::domain::DomainEvent;
use crate::ports::outbound::{
    CalcRuleCatalog, CalcRuleSummary, EventPublisher, FormTemplateRecord, FormTemplateRepository,
    ProductCatalog, ProductFormLinkRepository, ProductSummary, RepositoryError,
};

/// In-memory form template repository
#[derive(Default)]
pub struct InMemoryFormTemplateRepository {
    templates: DashMap<String, FormTemplateRecord>,
    offline: AtomicBool,
}

impl InMemoryFormTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a connection error until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection("template store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FormTemplateRepository for InMemoryFormTemplateRepository {
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<FormTemplateRecord>, RepositoryError> {
        self.ensure_online()?;
        Ok(self.templates.get(id.as_str()).map(|r| r.clone()))
    }

    async fn list(&self) -> Result<Vec<FormTemplateRecord>, RepositoryError> {
        self.ensure_online()?;
        Ok(self.templates.iter().map(|r| r.value().clone()).collect())
    }

    async fn save(&self, record: &FormTemplateRecord) -> Result<EntityId, RepositoryError> {
        self.ensure_online()?;
        let mut stored = record.clone();

        match &record.id {
            None => {
                let id = EntityId::new();
                stored.id = Some(id.clone());
                self.templates.insert(id.to_string(), stored);
                Ok(id)
            }
            Some(id) => {
                let mut existing = self.templates.get_mut(id.as_str()).ok_or(RepositoryError::NotFound)?;
                stored.created_at = existing.created_at;
                stored.updated_at = Utc::now();
                *existing = stored;
                Ok(id.clone())
            }
        }
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RepositoryError> {
        self.ensure_online()?;
        self.templates.remove(id.as_str());
        Ok(())
    }
}

/// In-memory product-form link repository
///
/// Keeps a (product, form template) index so a second link for the same
/// pair is rejected the way a unique constraint would.
#[derive(Default)]
pub struct InMemoryProductFormLinkRepository {
    links: DashMap<String, ProductFormLink>,
    pairs: DashMap<(String, String), String>,
}

impl InMemoryProductFormLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn pair_key(link: &ProductFormLink) -> (String, String) {
        (link.product_id().to_string(), link.form_template_id().to_string())
    }

    /// Stored rows never carry pending events
    fn row(link: &ProductFormLink) -> ProductFormLink {
        let mut row = link.clone();
        row.take_events();
        row
    }
}

#[async_trait]
impl ProductFormLinkRepository for InMemoryProductFormLinkRepository {
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<ProductFormLink>, RepositoryError> {
        Ok(self.links.get(id.as_str()).map(|l| l.clone()))
    }

    async fn find_by_product(&self, product_id: &EntityId) -> Result<Vec<ProductFormLink>, RepositoryError> {
        Ok(self.links.iter()
            .filter(|l| l.product_id() == product_id)
            .map(|l| l.value().clone())
            .collect())
    }

    async fn find_by_form_template(&self, form_template_id: &EntityId) -> Result<Vec<ProductFormLink>, RepositoryError> {
        Ok(self.links.iter()
            .filter(|l| l.form_template_id() == form_template_id)
            .map(|l| l.value().clone())
            .collect())
    }

    async fn insert(&self, link: &ProductFormLink) -> Result<(), RepositoryError> {
        let key = Self::pair_key(link);
        match self.pairs.entry(key) {
            Entry::Occupied(entry) => {
                let (product_id, form_template_id) = entry.key();
                Err(RepositoryError::DuplicateKey(format!("{}/{}", product_id, form_template_id)))
            }
            Entry::Vacant(entry) => {
                entry.insert(link.id().to_string());
                self.links.insert(link.id().to_string(), Self::row(link));
                Ok(())
            }
        }
    }

    async fn update(&self, link: &ProductFormLink) -> Result<(), RepositoryError> {
        let mut existing = self.links.get_mut(link.id().as_str()).ok_or(RepositoryError::NotFound)?;
        if !existing.same_pair(link) {
            return Err(RepositoryError::Query("a link cannot change its product or form template".into()));
        }
        *existing = Self::row(link);
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RepositoryError> {
        let (_, link) = self.links.remove(id.as_str()).ok_or(RepositoryError::NotFound)?;
        self.pairs.remove(&Self::pair_key(&link));
        Ok(())
    }
}

/// In-memory product catalog
#[derive(Default)]
pub struct InMemoryProductCatalog {
    products: DashMap<String, ProductSummary>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: impl Into<EntityId>, name: impl Into<String>) {
        let id = id.into();
        self.products.insert(id.to_string(), ProductSummary { id, name: name.into() });
    }

    pub fn remove(&self, id: &EntityId) {
        self.products.remove(id.as_str());
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<ProductSummary>, RepositoryError> {
        Ok(self.products.get(id.as_str()).map(|p| p.clone()))
    }
}

/// In-memory calculation rule catalog
#[derive(Default)]
pub struct InMemoryCalcRuleCatalog {
    rules: DashMap<String, CalcRuleSummary>,
}

impl InMemoryCalcRuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, rule: CalcRuleSummary) {
        self.rules.insert(rule.id.to_string(), rule);
    }

    pub fn remove(&self, id: &EntityId) {
        self.rules.remove(id.as_str());
    }
}

#[async_trait]
impl CalcRuleCatalog for InMemoryCalcRuleCatalog {
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<CalcRuleSummary>, RepositoryError> {
        Ok(self.rules.get(id.as_str()).map(|r| r.clone()))
    }

    async fn list(&self, usage_category: Option<&str>) -> Result<Vec<CalcRuleSummary>, RepositoryError> {
        Ok(self.rules.iter()
            .filter(|r| match usage_category {
                Some(category) => r.usage_category.as_deref() == Some(category),
                None => true,
            })
            .map(|r| r.value().clone())
            .collect())
    }
}

/// No-op event publisher
#[derive(Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Event publisher that keeps everything it receives
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).extend(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::LinkPatch;
    use crate::domain::value_objects::{Channel, FormCategory};
    use serde_json::json;

    fn record(name: &str) -> FormTemplateRecord {
        let now = Utc::now();
        FormTemplateRecord {
            id: None,
            name: name.into(),
            description: None,
            category: FormCategory::NonVie,
            product_type: "auto".into(),
            target_channels: vec![Channel::Both],
            steps: json!({"step1": {"title": "Véhicule", "fields": []}}),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_template_save_creates_then_updates() {
        let repo = InMemoryFormTemplateRepository::new();

        let id = repo.save(&record("Auto")).await.unwrap();
        let mut stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.id.as_ref(), Some(&id));

        stored.name = "Auto v2".into();
        let same = repo.save(&stored).await.unwrap();
        assert_eq!(same, id);
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().name, "Auto v2");
    }

    #[tokio::test]
    async fn test_template_update_of_unknown_id_is_not_found() {
        let repo = InMemoryFormTemplateRepository::new();
        let mut orphan = record("Auto");
        orphan.id = Some(EntityId::from_string("missing"));
        assert_eq!(repo.save(&orphan).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_offline_repository_fails_with_connection_error() {
        let repo = InMemoryFormTemplateRepository::new();
        repo.set_offline(true);
        assert!(matches!(repo.save(&record("Auto")).await, Err(RepositoryError::Connection(_))));
        repo.set_offline(false);
        assert!(repo.save(&record("Auto")).await.is_ok());
    }

    #[tokio::test]
    async fn test_link_pair_is_unique() {
        let repo = InMemoryProductFormLinkRepository::new();
        let product = EntityId::from_string("prod-1");
        let form = EntityId::from_string("tpl-1");

        let first = ProductFormLink::create(product.clone(), form.clone(), Channel::Both, 0);
        let second = ProductFormLink::create(product.clone(), form.clone(), Channel::B2b, 1);

        repo.insert(&first).await.unwrap();
        assert!(matches!(repo.insert(&second).await, Err(RepositoryError::DuplicateKey(_))));
        assert_eq!(repo.len(), 1);

        repo.delete(first.id()).await.unwrap();
        assert!(repo.insert(&second).await.is_ok());
        assert_eq!(repo.find_by_product(&product).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stored_links_have_no_pending_events() {
        let repo = InMemoryProductFormLinkRepository::new();
        let mut link = ProductFormLink::create(EntityId::new(), EntityId::new(), Channel::Both, 0);
        repo.insert(&link).await.unwrap();

        let mut stored = repo.find_by_id(link.id()).await.unwrap().unwrap();
        assert!(stored.take_events().is_empty());

        link.apply(LinkPatch { display_order: Some(4), ..Default::default() });
        repo.update(&link).await.unwrap();

        let mut stored = repo.find_by_id(link.id()).await.unwrap().unwrap();
        assert_eq!(stored.display_order(), 4);
        assert!(stored.take_events().is_empty());
        assert_eq!(link.take_events().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_link_is_not_found() {
        let repo = InMemoryProductFormLinkRepository::new();
        assert_eq!(repo.delete(&EntityId::new()).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_calc_rule_catalog_filters_by_usage() {
        let catalog = InMemoryCalcRuleCatalog::new();
        catalog.add(CalcRuleSummary {
            id: EntityId::from_string("r1"),
            name: "Tarif auto".into(),
            rule_type: "formula".into(),
            usage_category: Some("auto".into()),
        });
        catalog.add(CalcRuleSummary {
            id: EntityId::from_string("r2"),
            name: "Tarif MRH".into(),
            rule_type: "grid".into(),
            usage_category: Some("habitation".into()),
        });

        assert_eq!(catalog.list(Some("auto")).await.unwrap().len(), 1);
        assert_eq!(catalog.list(None).await.unwrap().len(), 2);
    }
}
