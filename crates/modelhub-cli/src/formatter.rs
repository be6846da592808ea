//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::Table;
use serde_json::Value;

use crate::commands::{CheckReport, ModelSummary};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the model list.
    fn format_models(&self, models: &[ModelSummary]) -> String;

    /// Format a model description.
    fn format_model(&self, description: &Value) -> String;

    /// Format a check report.
    fn format_check(&self, report: &CheckReport) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_models(&self, models: &[ModelSummary]) -> String {
        if models.is_empty() {
            return "No models".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Model", "State", "Location"]);
        for model in models {
            table.add_row(vec![&model.name, &model.state, &model.location]);
        }
        table.to_string()
    }

    fn format_model(&self, description: &Value) -> String {
        let mut output = format!(
            "{} ({})",
            value_str(&description["model"]),
            value_str(&description["collection"])
        );

        let mut table = Table::new();
        table.set_header(vec!["Field", "Type", "Required", "Index", "Default"]);
        if let Some(fields) = description["fields"].as_object() {
            for (name, field) in fields {
                table.add_row(vec![
                    name.clone(),
                    value_str(&field["type"]),
                    flag(&field["required"]),
                    flag(&field["index"]),
                    field.get("default").map_or_else(String::new, Value::to_string),
                ]);
            }
        }
        output.push('\n');
        output.push_str(&table.to_string());

        for (label, key) in [
            ("Virtuals", "virtuals"),
            ("Methods", "methods"),
            ("Plugins", "plugins"),
            ("Pending", "pending"),
        ] {
            let items = string_list(&description[key]);
            if !items.is_empty() {
                output.push_str(&format!("\n{}: {}", label, items.join(", ")));
            }
        }
        output
    }

    fn format_check(&self, report: &CheckReport) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Model", "Status", "Detail"]);
        for name in &report.built {
            table.add_row(vec![name.as_str(), "ok", ""]);
        }
        for (name, error) in &report.failed {
            table.add_row(vec![name.as_str(), "failed", error.as_str()]);
        }
        for label in &report.unresolved {
            table.add_row(vec![label.as_str(), "unresolved", "target model never built"]);
        }

        format!(
            "{}\n{} built, {} failed, {} unresolved",
            table,
            report.built.len(),
            report.failed.len(),
            report.unresolved.len()
        )
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_models(&self, models: &[ModelSummary]) -> String {
        serde_json::to_string_pretty(models).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_model(&self, description: &Value) -> String {
        serde_json::to_string_pretty(description).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_check(&self, report: &CheckReport) -> String {
        let failed: Vec<Value> = report
            .failed
            .iter()
            .map(|(model, error)| serde_json::json!({ "model": model, "error": error }))
            .collect();
        serde_json::to_string_pretty(&serde_json::json!({
            "ok": report.is_ok(),
            "built": report.built,
            "failed": failed,
            "unresolved": report.unresolved,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({
            "error": error
        })
        .to_string()
    }
}

fn value_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn flag(value: &Value) -> String {
    if value.as_bool().unwrap_or(false) {
        "yes".to_string()
    } else {
        String::new()
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().map(value_str).collect())
        .unwrap_or_default()
}
