//! Inbound ports (Use case traits)
//!
//! Hexagonal architecture: application service interfaces.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::dto::*;
use crate::domain::aggregates::{FormTemplate, LinkPatch, ProductFormLink};
use crate::domain::structure::EditError;
use crate::domain::value_objects::{Channel, EntityId, FormCategory};
use crate::ports::outbound::{CalcRuleSummary, RepositoryError};

/// Form template management use cases
#[async_trait]
pub trait FormTemplateUseCases: Send + Sync {
    /// Create a new template
    async fn create_template(&self, command: CreateFormTemplateCommand) -> Result<FormTemplate, UseCaseError>;

    /// Update metadata, structure or activation of an existing template
    async fn update_template(&self, command: UpdateFormTemplateCommand) -> Result<FormTemplate, UseCaseError>;

    /// Create or update depending on the presence of a template id
    async fn save_template(&self, command: SaveFormTemplateCommand) -> Result<FormTemplate, UseCaseError>;

    /// Load a template; malformed steps degrade to an empty structure with warnings
    async fn load_template(&self, id: &EntityId) -> Result<LoadedTemplate, UseCaseError>;

    /// Copy a template under a new id
    async fn duplicate_template(&self, source_id: &EntityId, name: Option<String>) -> Result<FormTemplate, UseCaseError>;

    /// All templates
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, UseCaseError>;

    /// Active templates whose metadata matches a product
    async fn suggest_templates(&self, category: FormCategory, product_type: &str) -> Result<Vec<TemplateSummary>, UseCaseError>;

    /// Delete a template; links pointing at it become orphans
    async fn delete_template(&self, id: &EntityId) -> Result<(), UseCaseError>;
}

/// Product-form link use cases
#[async_trait]
pub trait ProductFormLinkUseCases: Send + Sync {
    /// Link an existing template to a product
    async fn link(&self, command: LinkCommand) -> Result<ProductFormLink, UseCaseError>;

    /// Create a template and link it
    async fn link_new_template(
        &self,
        product_id: &EntityId,
        command: CreateFormTemplateCommand,
        channel: Channel,
        display_order: i32,
    ) -> Result<(FormTemplate, ProductFormLink), UseCaseError>;

    /// Duplicate a template and link the copy
    async fn link_duplicate(
        &self,
        product_id: &EntityId,
        source_template_id: &EntityId,
        channel: Channel,
        display_order: i32,
    ) -> Result<(FormTemplate, ProductFormLink), UseCaseError>;

    /// Remove a link; succeeds when it is already gone
    async fn unlink(&self, link_id: &EntityId) -> Result<(), UseCaseError>;

    /// Change channel, calc rule, activation or order
    async fn update_link(&self, link_id: &EntityId, patch: LinkPatch) -> Result<ProductFormLink, UseCaseError>;

    /// Links of a product ordered by display order
    async fn list_for_product(&self, product_id: &EntityId) -> Result<Vec<LinkView>, UseCaseError>;

    /// Links pointing at a form template
    async fn list_for_form_template(&self, form_template_id: &EntityId) -> Result<Vec<LinkView>, UseCaseError>;

    /// Calculation rules offered in the rule picker, sorted by name
    async fn calc_rule_options(&self, usage_category: Option<&str>) -> Result<Vec<CalcRuleSummary>, UseCaseError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UseCaseError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("form template {form_template_id} is already linked to product {product_id}")]
    DuplicateLink {
        product_id: EntityId,
        form_template_id: EntityId,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("domain error: {0}")]
    Domain(#[from] EditError),
}

impl UseCaseError {
    /// Recoverable storage failure; in-memory state should be kept for a retry
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
