//! Markdown rendering of Gateway results.
//!
//! Everything here is a pure function of its input; the tool handlers decide
//! what to fetch and these decide how it reads.

use datagroom_gateway::models::{DatasetEntry, DatasetList, Filter, Row};
use serde_json::Value;

/// Rows shown by [`markdown_table`] unless the caller asks otherwise
pub const DEFAULT_TABLE_ROWS: usize = 50;

/// Structured cell values are cut to this many characters
const CELL_LIMIT: usize = 50;

/// Internal identifier column the Gateway adds to every row
const ID_COLUMN: &str = "_id";

/// Sample values listed per column in [`schema_info`]
const MAX_SAMPLE_VALUES: usize = 5;

/// Schema of one dataset, ready to render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaView {
    pub dataset_name: String,
    pub total_rows: u64,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: String,
    pub sample_values: Vec<Value>,
}

/// Plain-text form of a JSON value: strings unquoted, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn table_cell(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(structured @ (Value::Object(_) | Value::Array(_))) => {
            structured.to_string().chars().take(CELL_LIMIT).collect()
        }
        Some(scalar) => display_value(scalar),
    }
}

/// Render rows as a markdown table.
///
/// Columns come from the first row's keys, minus `_id`. At most `max_rows`
/// rows are shown, followed by a notice when some were left out.
pub fn markdown_table(rows: &[Row], max_rows: usize) -> String {
    let Some(first) = rows.first() else {
        return "No data to display.".to_string();
    };

    let columns: Vec<&str> = first
        .keys()
        .map(String::as_str)
        .filter(|column| *column != ID_COLUMN)
        .collect();

    let mut lines = Vec::with_capacity(rows.len().min(max_rows) + 4);
    lines.push(format!("| {} |", columns.join(" | ")));
    lines.push(format!("| {} |", vec!["---"; columns.len()].join(" | ")));

    for row in rows.iter().take(max_rows) {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| table_cell(row.get(*column)))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    if rows.len() > max_rows {
        lines.push(String::new());
        lines.push(format!("_(Showing first {max_rows} of {} rows)_", rows.len()));
    }

    lines.join("\n")
}

/// Header of a query result: counts, offset and the filters that were applied
pub fn query_summary(
    dataset_name: &str,
    total_matching: u64,
    rows_returned: usize,
    filters: &[Filter],
    offset: u64,
) -> String {
    let mut lines = vec![
        format!("# Dataset: {dataset_name}"),
        String::new(),
        format!("**Total Matching Rows**: {total_matching}"),
        format!("**Rows Returned**: {rows_returned}"),
        format!("**Offset**: {offset}"),
    ];

    if !filters.is_empty() {
        lines.push(String::new());
        lines.push("**Applied Filters**:".to_string());
        for filter in filters {
            let field = filter.field.as_deref().unwrap_or("unknown");
            let kind = filter.kind.as_deref().unwrap_or("unknown");
            let value = filter.value.as_ref().map(display_value).unwrap_or_default();
            lines.push(format!("- `{field}` {kind} `{value}`"));
        }
    }

    lines.join("\n")
}

pub fn schema_info(schema: &SchemaView) -> String {
    let mut lines = vec![
        format!("# Dataset: {}", schema.dataset_name),
        String::new(),
        format!("**Total Rows**: {}", schema.total_rows),
        String::new(),
        "## Columns".to_string(),
        String::new(),
    ];

    for column in &schema.columns {
        lines.push(format!("### {}", column.name));
        lines.push(format!("- **Type**: {}", column.kind));

        if !column.sample_values.is_empty() {
            let samples: Vec<String> = column
                .sample_values
                .iter()
                .take(MAX_SAMPLE_VALUES)
                .map(display_value)
                .collect();
            lines.push(format!("- **Sample values**: {}", samples.join(", ")));
        }

        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn aggregation_results(results: &[Row]) -> String {
    if results.is_empty() {
        return "No aggregation results.".to_string();
    }

    let mut lines = vec!["# Aggregation Results".to_string(), String::new()];

    for (index, result) in results.iter().enumerate() {
        lines.push(format!("## Result {}", index + 1));
        for (key, value) in result.iter().filter(|(key, _)| key.as_str() != ID_COLUMN) {
            lines.push(format!("- **{key}**: {}", display_value(value)));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn dataset_list(list: &DatasetList) -> String {
    if list.db_list.is_empty() {
        return "No datasets found. You may not have access to any datasets.".to_string();
    }

    let mut lines = vec!["# Available Datasets".to_string(), String::new()];

    for entry in &list.db_list {
        match entry {
            DatasetEntry::Detailed(info) => lines.push(format!(
                "- **{}** (Size: {:.2} MB, Owner: {})",
                info.name(),
                info.size_mib(),
                info.owner()
            )),
            DatasetEntry::Name(name) => lines.push(format!("- {name}")),
        }
    }

    lines.join("\n")
}

/// Header placed above a sample table
pub fn sample_summary(dataset_name: &str, total_rows: u64, sample_size: usize) -> String {
    format!(
        "# Sample from {dataset_name}\n\n**Total rows in dataset**: {total_rows}\n**Sample size**: {sample_size}\n\n"
    )
}
