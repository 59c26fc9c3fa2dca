//! Field library command

use courtage_forms::FieldType;
use serde::Serialize;
use tabled::Tabled;

use crate::output::OutputFormat;

#[derive(Debug, Serialize, Tabled)]
pub struct FieldTypeRow {
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[tabled(rename = "Default label")]
    pub default_label: &'static str,
    #[tabled(rename = "Choice")]
    pub choice: bool,
}

pub fn handle(format: OutputFormat) {
    let rows: Vec<FieldTypeRow> = FieldType::ALL
        .iter()
        .map(|&t| FieldTypeRow {
            field_type: t,
            default_label: t.default_label(),
            choice: t.is_choice(),
        })
        .collect();

    format.print_rows(&rows);
}
