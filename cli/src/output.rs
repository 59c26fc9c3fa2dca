//! Output formatting

use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

impl OutputFormat {
    /// Rows as a table, or as a JSON/YAML list
    pub fn print_rows<T: Serialize + Tabled>(&self, rows: &[T]) {
        match self {
            OutputFormat::Table => print_table(rows),
            OutputFormat::Json | OutputFormat::Yaml => self.print_document(&rows),
        }
    }

    /// Documents without a tabular view; tables fall back to JSON
    pub fn print_document<T: Serialize>(&self, data: &T) {
        match self {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data).unwrap_or_default()),
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default())
            }
        }
    }
}

pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("(empty)");
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}
