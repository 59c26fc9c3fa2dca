//! Courtage Forms
//!
//! Form structure model for insurance product templates: the two-phase
//! (cotation / souscription) structure, its editor operations, the
//! storage codec for both persisted shapes, and the product-form links.
//!
//! ## Architecture
//!
//! - **Domain Layer**: structure model, aggregates, value objects, domain events
//! - **Application Layer**: use case orchestration, DTOs, editor session
//! - **Ports Layer**: hexagonal architecture interfaces
//! - **Infrastructure Layer**: in-memory adapters
//!
//! ## Key Aggregates
//!
//! - **FormTemplate**: named form structure with category and product metadata
//! - **ProductFormLink**: product to form template association per channel

pub mod domain;
pub mod application;
pub mod ports;
pub mod infrastructure;
pub mod config;

// Re-exports for convenience
pub use domain::aggregates::{FormTemplate, LinkPatch, ProductFormLink, TemplateMetadata};
pub use domain::structure::{
    parser::{parse, parse_with_report},
    EditError, FieldDefinition, FieldPatch, FormStructure, ParseWarning, Phase, StepContent, StorageFormat, SubStep,
};
pub use domain::services::{StructureValidator, ValidationReport};
pub use domain::value_objects::{Channel, EntityId, FieldType, FormCategory, PhaseId};
pub use domain::events::{DomainEvent, FormTemplateEvent, LinkEvent};
pub use application::{EditorSession, FormTemplateService, ProductFormLinkService};
pub use ports::inbound::{FormTemplateUseCases, ProductFormLinkUseCases, UseCaseError};
pub use ports::outbound::{FormTemplateRepository, ProductFormLinkRepository, RepositoryError};
pub use config::{ConfigError, FormsConfig};
