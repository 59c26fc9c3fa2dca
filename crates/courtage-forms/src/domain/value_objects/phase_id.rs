//! Phase Identifier Value Object

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two fixed phases of a subscription form.
///
/// Declaration order is the display order: premium calculation
/// (`cotation`) always precedes client onboarding (`souscription`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseId {
    Cotation,
    Souscription,
}

impl PhaseId {
    pub const ALL: [PhaseId; 2] = [PhaseId::Cotation, PhaseId::Souscription];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cotation => "cotation",
            Self::Souscription => "souscription",
        }
    }

    /// Position of the phase inside a form structure
    pub fn index(&self) -> usize {
        match self {
            Self::Cotation => 0,
            Self::Souscription => 1,
        }
    }

    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Cotation => "Cotation",
            Self::Souscription => "Souscription",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseId {
    type Err = PhaseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cotation" => Ok(Self::Cotation),
            "souscription" => Ok(Self::Souscription),
            other => Err(PhaseIdError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseIdError {
    #[error("unknown phase: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_order() {
        assert!(PhaseId::Cotation < PhaseId::Souscription);
        assert_eq!(PhaseId::ALL.map(|p| p.index()), [0, 1]);
    }

    #[test]
    fn test_parse() {
        assert_eq!("souscription".parse::<PhaseId>().unwrap(), PhaseId::Souscription);
        assert!("Cotation".parse::<PhaseId>().is_err());
    }
}
