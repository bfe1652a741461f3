//! The five Datagroom tools.
//!
//! Each handler does its Gateway round trips and hands the result to a
//! formatter. Failures come back as [`ToolError`]; turning them into text is
//! the serving layer's job.

use datagroom_gateway::models::{Filter, SortDirection, ViewQuery};
use datagroom_gateway::{GatewayClient, GatewayError};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::aggregate::{AGGREGATION_ROW_CAP, AggregationSpec, aggregate};
use crate::format::{self, ColumnInfo, DEFAULT_TABLE_ROWS, SchemaView};

pub const DEFAULT_VIEW: &str = "default";
pub const DEFAULT_USER: &str = "mcp-user";
pub const DEFAULT_QUERY_ROWS: u64 = 100;
pub const MAX_QUERY_ROWS: u64 = 1000;
pub const DEFAULT_SAMPLE_SIZE: u64 = 20;
pub const MAX_SAMPLE_SIZE: u64 = 100;

/// Column type reported when the view has no editor for a column
const DEFAULT_COLUMN_TYPE: &str = "string";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to {action}. {source}")]
    Gateway {
        action: String,
        source: GatewayError,
    },
    #[error("Failed to {action}. {message}")]
    InvalidArgument { action: String, message: String },
}

pub type ToolResult = Result<String, ToolError>;

fn gateway_failure(action: &str) -> impl FnOnce(GatewayError) -> ToolError + '_ {
    move |source| ToolError::Gateway {
        action: action.to_string(),
        source,
    }
}

fn check_range(action: &str, name: &str, value: u64, max: u64) -> Result<(), ToolError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ToolError::InvalidArgument {
            action: action.to_string(),
            message: format!("{name} must be between 1 and {max}, got {value}"),
        })
    }
}

/// What a tool was doing, as it reads after "Failed to"
fn describe(verb: &str, dataset: Option<&str>) -> String {
    match dataset {
        Some(dataset) => format!("{verb} '{dataset}'"),
        None => verb.to_string(),
    }
}

/// Decode a tool's `arguments` object.
///
/// A malformed argument is reported the same way as an out-of-range one, so
/// the caller sees `Failed to <verb> '<dataset>'. <reason>`.
pub fn decode_args<T: DeserializeOwned>(verb: &str, arguments: Value) -> Result<T, ToolError> {
    let action = describe(verb, arguments.get("dataset_name").and_then(Value::as_str));
    serde_json::from_value(arguments).map_err(|err| ToolError::InvalidArgument {
        action,
        message: format!("invalid arguments: {err}"),
    })
}

/// 1-based Gateway page holding `offset`.
///
/// The Gateway pages rather than slices, so an offset that is not a multiple
/// of `max_rows` starts at the beginning of its page.
pub fn page_for_offset(offset: u64, max_rows: u64) -> u64 {
    offset / max_rows + 1
}

fn default_view() -> String {
    DEFAULT_VIEW.to_string()
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_query_rows() -> u64 {
    DEFAULT_QUERY_ROWS
}

fn default_sample_size() -> u64 {
    DEFAULT_SAMPLE_SIZE
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaArgs {
    pub dataset_name: String,
    #[serde(default = "default_view")]
    pub view_name: String,
    #[serde(default = "default_user")]
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryArgs {
    pub dataset_name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default = "default_query_rows")]
    pub max_rows: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_view")]
    pub view_name: String,
    #[serde(default = "default_user")]
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregateArgs {
    pub dataset_name: String,
    pub aggregations: Vec<AggregationSpec>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default = "default_view")]
    pub view_name: String,
    #[serde(default = "default_user")]
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListArgs {
    #[serde(default = "default_user")]
    pub user_name: String,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            user_name: default_user(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleArgs {
    pub dataset_name: String,
    #[serde(default = "default_sample_size")]
    pub sample_size: u64,
    #[serde(default = "default_view")]
    pub view_name: String,
    #[serde(default = "default_user")]
    pub user_name: String,
}

/// Tool handlers sharing one Gateway client
#[derive(Debug)]
pub struct DatagroomTools {
    client: GatewayClient,
}

impl DatagroomTools {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    /// Column names, types and the total row count of a dataset
    pub async fn get_schema(&self, args: SchemaArgs) -> ToolResult {
        let action = describe("get schema for dataset", Some(&args.dataset_name));
        let SchemaArgs {
            dataset_name,
            view_name,
            user_name,
        } = args;

        let view = self
            .client
            .view_columns(&dataset_name, &view_name, &user_name)
            .await
            .map_err(gateway_failure(&action))?;

        let count = self
            .client
            .view_via_post(&dataset_name, &view_name, &user_name, &ViewQuery::count_only())
            .await
            .map_err(gateway_failure(&action))?;

        let columns = view
            .ordered_column_names()
            .into_iter()
            .map(|name| {
                let kind = match view.attr_for(&name).and_then(|attr| attr.editor.as_ref()) {
                    Some(editor) if !editor.is_null() => format::display_value(editor),
                    _ => DEFAULT_COLUMN_TYPE.to_string(),
                };
                ColumnInfo {
                    name,
                    kind,
                    sample_values: Vec::new(),
                }
            })
            .collect();

        let schema = SchemaView {
            dataset_name,
            total_rows: count.total,
            columns,
        };
        Ok(format::schema_info(&schema))
    }

    /// One page of rows matching the filters
    pub async fn query_dataset(&self, args: QueryArgs) -> ToolResult {
        let action = describe("query dataset", Some(&args.dataset_name));
        check_range(&action, "max_rows", args.max_rows, MAX_QUERY_ROWS)?;

        let page = page_for_offset(args.offset, args.max_rows);
        let mut query = ViewQuery::page_of(args.filters.clone(), page, args.max_rows);
        if let Some(field) = args.sort_field.as_deref() {
            query = query.with_sorter(field, args.sort_direction);
        }
        tracing::debug!(dataset = %args.dataset_name, page, per_page = args.max_rows, "querying dataset");

        let result = self
            .client
            .view_via_post(&args.dataset_name, &args.view_name, &args.user_name, &query)
            .await
            .map_err(gateway_failure(&action))?;

        let warning = if result.total > args.max_rows {
            format!(
                "\n\n⚠️ **Warning**: {} rows match your filters, but only returning first {}. \
                 Use offset parameter or refine filters.\n",
                result.total, args.max_rows
            )
        } else {
            String::new()
        };

        let summary = format::query_summary(
            &args.dataset_name,
            result.total,
            result.data.len(),
            &args.filters,
            args.offset,
        );
        let table = format::markdown_table(&result.data, DEFAULT_TABLE_ROWS);

        Ok(format!("{summary}\n\n{table}{warning}"))
    }

    /// count/sum/avg/min/max over at most [`AGGREGATION_ROW_CAP`] matching rows
    pub async fn aggregate_dataset(&self, args: AggregateArgs) -> ToolResult {
        let action = describe("aggregate dataset", Some(&args.dataset_name));

        let query = ViewQuery::page_of(args.filters, 1, AGGREGATION_ROW_CAP);
        let result = self
            .client
            .view_via_post(&args.dataset_name, &args.view_name, &args.user_name, &query)
            .await
            .map_err(gateway_failure(&action))?;

        if result.data.is_empty() {
            return Ok(format!(
                "No data found in dataset '{}' with the given filters.",
                args.dataset_name
            ));
        }
        if result.total > AGGREGATION_ROW_CAP {
            tracing::warn!(
                dataset = %args.dataset_name,
                total = result.total,
                "aggregating over the first {AGGREGATION_ROW_CAP} rows only"
            );
        }

        let results = aggregate(&result.data, &args.aggregations, args.group_by.as_deref());
        Ok(format::aggregation_results(&results))
    }

    /// Datasets the user can see
    pub async fn list_datasets(&self, args: ListArgs) -> ToolResult {
        let list = self
            .client
            .dataset_list(&args.user_name)
            .await
            .map_err(gateway_failure("list datasets"))?;

        Ok(format::dataset_list(&list))
    }

    /// The first `sample_size` rows of a dataset
    pub async fn sample_dataset(&self, args: SampleArgs) -> ToolResult {
        let action = describe("sample dataset", Some(&args.dataset_name));
        check_range(&action, "sample_size", args.sample_size, MAX_SAMPLE_SIZE)?;

        let query = ViewQuery::page_of(Vec::new(), 1, args.sample_size);
        let result = self
            .client
            .view_via_post(&args.dataset_name, &args.view_name, &args.user_name, &query)
            .await
            .map_err(gateway_failure(&action))?;

        if result.data.is_empty() {
            return Ok(format!(
                "Dataset '{}' is empty or you don't have access.",
                args.dataset_name
            ));
        }

        let summary = format::sample_summary(&args.dataset_name, result.total, result.data.len());
        // sample_size is at most MAX_SAMPLE_SIZE, so the cast cannot truncate
        let table = format::markdown_table(&result.data, args.sample_size as usize);
        Ok(summary + &table)
    }
}
