//! Aggregates module

pub mod form_template;
pub mod product_form_link;

pub use form_template::{FormTemplate, TemplateMetadata};
pub use product_form_link::{LinkPatch, ProductFormLink};
