//! CLI Configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::CliError;

/// Profile stored in `~/.courtage/config.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path of the library JSON configuration
    pub forms_config: Option<String>,
    pub default_format: Option<String>,
    pub storage_format: Option<String>,
    pub log_level: Option<String>,
}

pub const KEYS: [&str; 4] = ["forms_config", "default_format", "storage_format", "log_level"];

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self, CliError> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| CliError::Config(e.to_string()))?;
            toml::from_str(&content).map_err(|e| CliError::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf, CliError> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CliError::Config(e.to_string()))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))?;
        fs::write(&path, content).map_err(|e| CliError::Config(e.to_string()))?;
        Ok(path)
    }

    pub fn get(&self, key: &str) -> Result<Option<&str>, CliError> {
        let value = match key {
            "forms_config" => &self.forms_config,
            "default_format" => &self.default_format,
            "storage_format" => &self.storage_format,
            "log_level" => &self.log_level,
            _ => return Err(CliError::Config(format!("Unknown config key: {}", key))),
        };
        Ok(value.as_deref())
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), CliError> {
        match key {
            "forms_config" => self.forms_config = Some(value),
            "default_format" => {
                value.parse::<crate::output::OutputFormat>().map_err(CliError::Config)?;
                self.default_format = Some(value);
            }
            "storage_format" => {
                value
                    .parse::<courtage_forms::StorageFormat>()
                    .map_err(CliError::Config)?;
                self.storage_format = Some(value);
            }
            "log_level" => self.log_level = Some(value),
            _ => return Err(CliError::Config(format!("Unknown config key: {}", key))),
        }
        Ok(())
    }

    fn config_path(profile: Option<&str>) -> Result<PathBuf, CliError> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Cannot find home directory".into()))?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".courtage").join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_rejects_unknown_values() {
        let mut config = Config::default();
        assert!(config.set("storage_format", "legacy".into()).is_ok());
        assert!(config.set("storage_format", "xml".into()).is_err());
        assert!(config.set("api_key", "x".into()).is_err());
        assert_eq!(config.get("storage_format").unwrap(), Some("legacy"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.set("default_format", "yaml".into()).unwrap();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.default_format.as_deref(), Some("yaml"));
        assert!(back.forms_config.is_none());
    }
}
