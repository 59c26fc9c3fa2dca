//! Application layer
//!
//! Orchestrates use cases and coordinates domain objects.

pub mod commands;
pub mod dto;
pub mod session;

pub use commands::{FormTemplateService, ProductFormLinkService};
pub use dto::*;
pub use session::EditorSession;
