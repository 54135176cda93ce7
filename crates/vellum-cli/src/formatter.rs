//! Output formatting for compiled queries and executed results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use serde_json::{json, Value};
use vellum_core::CompiledQuery;

/// Output format for executed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// ASCII table
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

/// Render a compiled query as a JSON document.
pub fn compiled_to_json(collection: &str, compiled: &CompiledQuery) -> Value {
    json!({
        "collection": collection,
        "filter": compiled.filter.to_json(),
        "sort": compiled.sort.to_json(),
        "sortDisabled": compiled.sort.is_disabled(),
        "truncated": compiled.truncated,
    })
}

/// Render matched documents.
pub fn format_documents(documents: &[Value], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(documents).unwrap_or_else(|e| format!("error: {e}"))
        }
        OutputFormat::Table => documents_table(documents),
    }
}

fn documents_table(documents: &[Value]) -> String {
    if documents.is_empty() {
        return "No results".to_string();
    }

    // Columns in first-seen order across all documents.
    let mut columns: Vec<&str> = Vec::new();
    for document in documents {
        if let Some(object) = document.as_object() {
            for key in object.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }

    let mut table = Table::new();
    table.set_header(columns.iter().map(|c| Cell::new(c)));
    for document in documents {
        table.add_row(
            columns
                .iter()
                .map(|column| Cell::new(cell_text(document.get(column)))),
        );
    }

    format!("{table}\n{} document(s)", documents.len())
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
