//! Distribution Channel Value Object

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distribution channel a product-form link applies to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    B2b,
    B2c,
    #[default]
    Both,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B2b => "b2b",
            Self::B2c => "b2c",
            Self::Both => "both",
        }
    }

    /// Whether a link on this channel serves requests coming from `other`
    pub fn covers(&self, other: Channel) -> bool {
        *self == Channel::Both || *self == other
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "b2b" => Ok(Self::B2b),
            "b2c" => Ok(Self::B2c),
            "both" => Ok(Self::Both),
            other => Err(ChannelError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("unknown channel: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_covers_everything() {
        assert!(Channel::Both.covers(Channel::B2b));
        assert!(Channel::Both.covers(Channel::B2c));
        assert!(Channel::B2b.covers(Channel::B2b));
        assert!(!Channel::B2b.covers(Channel::B2c));
    }

    #[test]
    fn test_parse() {
        assert_eq!("b2c".parse::<Channel>().unwrap(), Channel::B2c);
        assert_eq!("partner".parse::<Channel>(), Err(ChannelError::Unknown("partner".into())));
    }
}
