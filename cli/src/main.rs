//! Courtage CLI
//!
//! Offline tooling over persisted form template structures.
//!
//! # Usage
//!
//! ```bash
//! courtage structure normalize -f steps.json --target phases
//! courtage structure validate -f steps.json
//! courtage structure show -f steps.json --format yaml
//! courtage fields
//! courtage config set storage_format legacy
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use courtage_forms::{FormsConfig, StorageFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "courtage")]
#[command(author = "OpenCourtage")]
#[command(version)]
#[command(about = "Courtage forms command line interface", long_about = None)]
struct Cli {
    /// Library configuration (JSON)
    #[arg(long, env = "COURTAGE_FORMS_CONFIG")]
    forms_config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o')]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and convert persisted form structures
    Structure {
        #[command(subcommand)]
        action: StructureCommands,
    },
    /// List the field library
    Fields,
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum StructureCommands {
    /// Rewrite a steps document in one storage shape
    Normalize {
        #[arg(short, long)]
        file: PathBuf,
        /// phases | legacy
        #[arg(long)]
        target: Option<StorageFormat>,
    },
    /// Report parse warnings and validation issues
    Validate {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the phase / sub-step / field outline
    Show {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

fn forms_config(path: Option<PathBuf>) -> FormsConfig {
    let Some(path) = path else {
        return FormsConfig::default();
    };
    FormsConfig::load(&path).unwrap_or_else(|e| {
        tracing::warn!("Forms config {} not loaded ({}), using defaults", path.display(), e);
        FormsConfig::default()
    })
}

/// Storage shape for `structure normalize` when `--target` is absent.
///
/// A forms config named on the command line or in the environment wins over
/// the profile's `storage_format`.
fn storage_target(explicit_forms_config: bool, forms: &FormsConfig, profile: &config::Config) -> StorageFormat {
    if explicit_forms_config {
        return forms.storage_format;
    }
    profile
        .storage_format
        .as_deref()
        .and_then(|f| f.parse().ok())
        .unwrap_or(forms.storage_format)
}

fn main() {
    let cli = Cli::parse();

    let profile = config::Config::load(cli.profile.as_deref()).unwrap_or_else(|e| {
        eprintln!("{} {}", "warning:".yellow().bold(), e);
        config::Config::default()
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .ok()
                .or_else(|| profile.log_level.clone())
                .unwrap_or_else(|| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli
        .format
        .or_else(|| profile.default_format.as_deref().and_then(|f| f.parse().ok()))
        .unwrap_or(output::OutputFormat::Table);

    let explicit_forms_config = cli.forms_config.is_some();
    let forms = forms_config(cli.forms_config.or_else(|| profile.forms_config.as_ref().map(PathBuf::from)));
    let target = storage_target(explicit_forms_config, &forms, &profile);

    let result = match cli.command {
        Commands::Structure { action } => commands::structure::handle(action, target, format),
        Commands::Fields => {
            commands::fields::handle(format);
            Ok(())
        }
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
