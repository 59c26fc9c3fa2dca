//! CLI errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Serialize(#[from] courtage_forms::domain::structure::SerializeError),

    #[error("structure has {0} blocking issue(s)")]
    InvalidStructure(usize),
}
