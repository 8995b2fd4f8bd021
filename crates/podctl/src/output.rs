//! Output formatting for command results.

use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

/// How results are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns (default)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Render `items` as table rows built by `to_row`, or as a JSON array of
/// the items themselves. An empty table renders `empty`.
pub fn render_list<D, R>(
    items: Vec<D>,
    format: OutputFormat,
    empty: &str,
    to_row: impl FnMut(D) -> R,
) -> anyhow::Result<String>
where
    D: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&items)?),
        OutputFormat::Table if items.is_empty() => Ok(empty.to_string()),
        OutputFormat::Table => {
            let rows: Vec<R> = items.into_iter().map(to_row).collect();
            Ok(Table::new(rows).with(Style::blank()).to_string())
        }
    }
}

/// Render rows that are their own JSON form.
pub fn render_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat, empty: &str) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::Table if rows.is_empty() => Ok(empty.to_string()),
        OutputFormat::Table => Ok(Table::new(rows).with(Style::blank()).to_string()),
    }
}

/// Render one value: JSON, or the supplied one-line summary.
pub fn render_value<T: Serialize>(value: &T, format: OutputFormat, text: impl Into<String>) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => Ok(text.into()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
    }
}
