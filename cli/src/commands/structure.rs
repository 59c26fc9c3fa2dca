//! Structure commands over a persisted `steps` document

use std::path::Path;

use colored::Colorize;
use courtage_forms::domain::services::{Severity, ValidationIssue};
use courtage_forms::{parse_with_report, FormStructure, StepContent, StorageFormat, StructureValidator};
use serde::Serialize;
use tabled::Tabled;

use super::read_json;
use crate::error::CliError;
use crate::output::{print_table, OutputFormat};
use crate::StructureCommands;

pub fn handle(action: StructureCommands, default_target: StorageFormat, format: OutputFormat) -> Result<(), CliError> {
    match action {
        StructureCommands::Normalize { file, target } => normalize(&file, target.unwrap_or(default_target), format),
        StructureCommands::Validate { file } => validate(&file, format),
        StructureCommands::Show { file } => show(&file, format),
    }
}

fn load(path: &Path) -> Result<(FormStructure, Vec<String>), CliError> {
    let value = read_json(path)?;
    let parsed = parse_with_report(&value);
    let warnings = parsed.warnings.iter().map(ToString::to_string).collect();
    Ok((parsed.structure, warnings))
}

fn report_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

fn normalize(path: &Path, target: StorageFormat, format: OutputFormat) -> Result<(), CliError> {
    let (structure, warnings) = load(path)?;
    report_warnings(&warnings);

    let storage = structure.to_storage(target)?;
    tracing::info!("Normalized {} to {} shape", path.display(), target);
    format.print_document(&storage);
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
struct IssueRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Issue")]
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput<'a> {
    valid: bool,
    parse_warnings: &'a [String],
    issues: &'a [ValidationIssue],
}

fn validate(path: &Path, format: OutputFormat) -> Result<(), CliError> {
    let (structure, warnings) = load(path)?;
    let report = StructureValidator::validate(&structure);

    match format {
        OutputFormat::Table => {
            let mut rows: Vec<IssueRow> = warnings
                .iter()
                .map(|w| IssueRow { severity: "parse".dimmed().to_string(), message: w.clone() })
                .collect();
            rows.extend(report.issues.iter().map(|issue| IssueRow {
                severity: match issue.severity() {
                    Severity::Error => "error".red().to_string(),
                    Severity::Warning => "warning".yellow().to_string(),
                },
                message: issue.to_string(),
            }));
            print_table(&rows);
        }
        OutputFormat::Json | OutputFormat::Yaml => format.print_document(&ValidationOutput {
            valid: report.is_valid(),
            parse_warnings: &warnings,
            issues: &report.issues,
        }),
    }

    let errors = report.errors().count();
    if errors > 0 {
        return Err(CliError::InvalidStructure(errors));
    }
    if format == OutputFormat::Table {
        println!("{}", "structure is valid".green());
    }
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
struct OutlineRow {
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn outline(structure: &FormStructure) -> Vec<OutlineRow> {
    let mut rows = Vec::new();
    for (phase, step) in structure.steps() {
        let row = |item: String, detail: String| OutlineRow {
            phase: phase.to_string(),
            step: format!("{} ({})", step.title, step.id),
            kind: step.content.kind(),
            item,
            detail,
        };
        match &step.content {
            StepContent::Fields { fields } if fields.is_empty() => rows.push(row("-".into(), String::new())),
            StepContent::Fields { fields } => {
                for field in fields {
                    let required = if field.required { ", required" } else { "" };
                    rows.push(row(field.label.clone(), format!("{} [{}{}]", field.id, field.field_type, required)));
                }
            }
            StepContent::CalculationRules { calculation_rules } => {
                rows.push(row("formula".into(), calculation_rules.base_formula.clone()));
                for c in &calculation_rules.coefficients {
                    rows.push(row(format!("coefficient {}", c.name), c.value.to_string()));
                }
                for t in &calculation_rules.taxes {
                    rows.push(row(format!("tax {}", t.name), format!("{}% ({:?})", t.rate, t.kind)));
                }
            }
        }
    }
    rows
}

fn show(path: &Path, format: OutputFormat) -> Result<(), CliError> {
    let (structure, warnings) = load(path)?;
    report_warnings(&warnings);

    match format {
        OutputFormat::Table => {
            for phase in structure.phases() {
                println!("{} {} sub-step(s)", phase.name.bold(), phase.steps.len());
            }
            print_table(&outline(&structure));
        }
        OutputFormat::Json | OutputFormat::Yaml => format.print_document(&structure),
    }
    Ok(())
}
