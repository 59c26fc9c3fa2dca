//! Field Type Value Object
//!
//! The closed set of inputs offered by the field library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Input kind of a field definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Email,
    Phone,
    Select,
    Radio,
    Checkbox,
    File,
    Currency,
}

impl FieldType {
    /// Every field type, in field library order
    pub const ALL: [FieldType; 11] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Date,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::File,
        FieldType::Currency,
    ];

    /// Label given to a field freshly added from the library
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::Text => "Champ texte",
            Self::Textarea => "Zone de texte",
            Self::Number => "Nombre",
            Self::Date => "Date",
            Self::Email => "Email",
            Self::Phone => "Téléphone",
            Self::Select => "Liste déroulante",
            Self::Radio => "Choix unique",
            Self::Checkbox => "Cases à cocher",
            Self::File => "Fichier",
            Self::Currency => "Montant",
        }
    }

    /// Whether the field draws its values from an options list
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Select | Self::Radio | Self::Checkbox)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Date => "date",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::File => "file",
            Self::Currency => "currency",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = FieldTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FieldTypeError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldTypeError {
    #[error("unknown field type: {0}")]
    Unknown(String),
}
