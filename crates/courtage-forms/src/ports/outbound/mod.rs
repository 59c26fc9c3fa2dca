//! Outbound ports (Repository traits)
//!
//! Hexagonal architecture: these are the interfaces that infrastructure must implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::aggregates::ProductFormLink;
use crate::domain::value_objects::{Channel, EntityId, FormCategory};
use crate::domain::DomainEvent;

/// Persisted form template row
///
/// `steps` is kept as raw JSON: either the legacy step map or the
/// phases shape, depending on when the row was last written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormTemplateRecord {
    /// `None` asks storage to create a new row
    pub id: Option<EntityId>,
    pub name: String,
    pub description: Option<String>,
    pub category: FormCategory,
    pub product_type: String,
    pub target_channels: Vec<Channel>,
    pub steps: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only product reference
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: EntityId,
    pub name: String,
}

/// Read-only calculation rule reference offered in the rule picker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalcRuleSummary {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    pub usage_category: Option<String>,
}

/// Form template repository port
#[async_trait]
pub trait FormTemplateRepository: Send + Sync {
    /// Find template row by ID
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<FormTemplateRecord>, RepositoryError>;

    /// All template rows
    async fn list(&self) -> Result<Vec<FormTemplateRecord>, RepositoryError>;

    /// Insert when `record.id` is `None`, update otherwise; returns the row id
    async fn save(&self, record: &FormTemplateRecord) -> Result<EntityId, RepositoryError>;

    /// Delete template row
    async fn delete(&self, id: &EntityId) -> Result<(), RepositoryError>;
}

/// Product-form link repository port
#[async_trait]
pub trait ProductFormLinkRepository: Send + Sync {
    /// Find link by ID
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<ProductFormLink>, RepositoryError>;

    /// Find links of a product
    async fn find_by_product(&self, product_id: &EntityId) -> Result<Vec<ProductFormLink>, RepositoryError>;

    /// Find links pointing at a form template
    async fn find_by_form_template(&self, form_template_id: &EntityId) -> Result<Vec<ProductFormLink>, RepositoryError>;

    /// Insert a new link; `DuplicateKey` when the (product, form template) pair exists
    async fn insert(&self, link: &ProductFormLink) -> Result<(), RepositoryError>;

    /// Update an existing link
    async fn update(&self, link: &ProductFormLink) -> Result<(), RepositoryError>;

    /// Delete link
    async fn delete(&self, id: &EntityId) -> Result<(), RepositoryError>;
}

/// Product catalog port
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<ProductSummary>, RepositoryError>;
}

/// Calculation rule catalog port
#[async_trait]
pub trait CalcRuleCatalog: Send + Sync {
    async fn find_by_id(&self, id: &EntityId) -> Result<Option<CalcRuleSummary>, RepositoryError>;

    /// Rules, optionally restricted to one usage category
    async fn list(&self, usage_category: Option<&str>) -> Result<Vec<CalcRuleSummary>, RepositoryError>;
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish domain events
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;
}

/// Repository error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
