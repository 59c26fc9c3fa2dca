//! Domain Services
//!
//! Stateless domain logic spanning a whole structure.

pub mod validation;

pub use validation::{Severity, StructureValidator, ValidationIssue, ValidationReport};
