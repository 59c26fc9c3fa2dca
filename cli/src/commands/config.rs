//! Config commands

use colored::Colorize;

use crate::config::{Config, KEYS};
use crate::error::CliError;
use crate::ConfigCommands;

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> Result<(), CliError> {
    match action {
        ConfigCommands::Init => {
            let config = Config {
                default_format: Some("table".into()),
                storage_format: Some("phases".into()),
                log_level: Some("info".into()),
                ..Config::default()
            };
            let path = config.save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(profile)?;
            config.set(&key, value)?;
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile)?;
            let value = config.get(&key)?;
            println!("{}: {}", key, value.unwrap_or("(not set)"));
        }
        ConfigCommands::List => {
            let config = Config::load(profile)?;
            for key in KEYS {
                let value = config.get(key)?;
                println!("{}: {}", key.bold(), value.unwrap_or("(not set)"));
            }
        }
    }
    Ok(())
}
