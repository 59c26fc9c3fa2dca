//! Form Category Value Object

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Insurance line a form template belongs to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormCategory {
    #[serde(rename = "vie")]
    Vie,
    #[default]
    #[serde(rename = "non-vie")]
    NonVie,
}

impl FormCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vie => "vie",
            Self::NonVie => "non-vie",
        }
    }
}

impl fmt::Display for FormCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vie" => Ok(Self::Vie),
            "non-vie" => Ok(Self::NonVie),
            other => Err(CategoryError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("unknown form category: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_value(FormCategory::NonVie).unwrap(), serde_json::json!("non-vie"));
        assert_eq!("vie".parse::<FormCategory>().unwrap(), FormCategory::Vie);
    }
}
