//! CLI Commands

pub mod config;
pub mod fields;
pub mod structure;

use std::path::Path;

use serde_json::Value;

use crate::error::CliError;

/// Read a persisted `steps` document
pub fn read_json(path: &Path) -> Result<Value, CliError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Json { path: display, source })
}
