//! Forms Configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::structure::StorageFormat;

/// Library configuration shared by the application services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Shape written to the `steps` column on save
    pub storage_format: StorageFormat,
    /// Refuse saves whose structure has error-severity issues
    pub reject_invalid_structures: bool,
    /// Shown in link listings for a dangling form template id
    pub unknown_form_label: String,
    /// Shown in link listings for a dangling calc rule id
    pub unknown_calc_rule_label: String,
    /// Shown in link listings for a dangling product id
    pub unknown_product_label: String,
    /// Appended to the name of a duplicated template
    pub copy_suffix: String,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            storage_format: StorageFormat::Phases,
            reject_invalid_structures: true,
            unknown_form_label: "Formulaire inconnu".into(),
            unknown_calc_rule_label: "Règle inconnue".into(),
            unknown_product_label: "Produit inconnu".into(),
            copy_suffix: " (copie)".into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FormsConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Name used for a copy of `name`
    pub fn copy_name(&self, name: &str) -> String {
        format!("{}{}", name, self.copy_suffix)
    }
}
