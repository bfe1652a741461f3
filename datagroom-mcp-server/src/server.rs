use datagroom_gateway::{GatewayClient, GatewayConfig, GatewayError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::tools::{DatagroomTools, ToolResult, decode_args};

const SERVER_NAME: &str = "datagroom-mcp-server";
const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";
const INSTRUCTIONS: &str = "Tools for Datagroom datasets. Start with datagroom_list_datasets, \
    then datagroom_get_schema before querying, aggregating or sampling a dataset.";

pub struct DatagroomMcpServer {
    tools: DatagroomTools,
}

impl DatagroomMcpServer {
    pub fn new(tools: DatagroomTools) -> Self {
        Self { tools }
    }

    pub fn from_config(config: GatewayConfig) -> Result<Self, ServerError> {
        let client = GatewayClient::new(config)?;
        Ok(Self::new(DatagroomTools::new(client)))
    }

    /// Handle one raw JSON-RPC message; notifications produce no response
    pub async fn handle_message(&self, text: &str) -> Option<Response> {
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("unparsable message: {err}");
                return Some(Response::error(None, ServerError::Json(err)));
            }
        };

        let request = match serde_json::from_value::<Request>(value) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("invalid request: {err}");
                return Some(Response::error(
                    None,
                    ServerError::InvalidRequest(err.to_string()),
                ));
            }
        };

        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        };

        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(Some(id), result),
            Err(err) => {
                tracing::warn!(method = %request.method, "request failed: {err}");
                Response::error(Some(id), err)
            }
        };
        Some(response)
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        match method {
            "initialize" => {
                let params: InitializeParams = parse_optional_params(method, params)?;
                if let Some(client) = &params.client_info {
                    tracing::info!(
                        client = %client.name,
                        version = client.version.as_deref().unwrap_or("unknown"),
                        "client connected"
                    );
                }
                let result = InitializeResult::new(params.protocol_version);
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "ping" => Ok(json!({})),
            "shutdown" => Ok(Value::Null),
            "tools/list" => {
                let result = ListToolsResult {
                    tools: tool_descriptors(),
                    next_cursor: None,
                };
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "tools/call" => {
                let params: CallToolParams = parse_required_params(method, params)?;
                let response = self.call_tool(&params.name, params.arguments).await?;
                Ok(serde_json::to_value(response).map_err(ServerError::Serialization)?)
            }
            other => Err(ServerError::InvalidMethod(other.to_string())),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<ToolResponse, ServerError> {
        let spec = find_tool_spec(name).ok_or_else(|| ServerError::UnknownTool(name.to_string()))?;
        tracing::info!(tool = spec.tool_name, "tool call");

        let arguments = match arguments {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value @ Value::Object(_)) => value,
            Some(other) => {
                return Err(ServerError::InvalidParams(format!(
                    "{name}: arguments must be an object, got {other}"
                )));
            }
        };

        let outcome: ToolResult = match spec.tool_name {
            "datagroom_get_schema" => match decode_args(spec.action, arguments) {
                Ok(args) => self.tools.get_schema(args).await,
                Err(err) => Err(err),
            },
            "datagroom_query_dataset" => match decode_args(spec.action, arguments) {
                Ok(args) => self.tools.query_dataset(args).await,
                Err(err) => Err(err),
            },
            "datagroom_aggregate_dataset" => match decode_args(spec.action, arguments) {
                Ok(args) => self.tools.aggregate_dataset(args).await,
                Err(err) => Err(err),
            },
            "datagroom_list_datasets" => match decode_args(spec.action, arguments) {
                Ok(args) => self.tools.list_datasets(args).await,
                Err(err) => Err(err),
            },
            "datagroom_sample_dataset" => match decode_args(spec.action, arguments) {
                Ok(args) => self.tools.sample_dataset(args).await,
                Err(err) => Err(err),
            },
            other => return Err(ServerError::UnknownTool(other.to_string())),
        };

        Ok(match outcome {
            Ok(text) => ToolResponse::text(text),
            Err(err) => {
                tracing::error!(tool = spec.tool_name, "{err}");
                ToolResponse::error(format!("Error: {err}"))
            }
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

impl Response {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, error: ServerError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(ResponseError::from(error)),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|error| error.code)
    }
}

#[derive(Debug, Serialize)]
struct ResponseError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl From<ServerError> for ResponseError {
    fn from(err: ServerError) -> Self {
        let code = match &err {
            ServerError::Json(_) => -32700,
            ServerError::InvalidRequest(_) => -32600,
            ServerError::InvalidMethod(_) | ServerError::UnknownTool(_) => -32601,
            ServerError::InvalidParams(_) => -32602,
            ServerError::Serialization(_) => -32603,
            ServerError::Gateway(_) => -32010,
            ServerError::Io(_) => -32020,
        };
        Self {
            code,
            message: err.to_string(),
            data: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unknown method: {0}")]
    InvalidMethod(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),
}

type ServerResult<T> = Result<T, ServerError>;

fn parse_required_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned,
{
    match params {
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
        None => Err(ServerError::InvalidParams(format!(
            "{method}: missing parameters"
        ))),
    }
}

fn parse_optional_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned + Default,
{
    match params {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    #[serde(default, rename = "protocolVersion")]
    protocol_version: Option<String>,
    #[serde(default, rename = "clientInfo")]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    capabilities: Value,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
    instructions: &'static str,
}

impl InitializeResult {
    fn new(requested_version: Option<String>) -> Self {
        Self {
            protocol_version: requested_version
                .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
            capabilities: json!({
                "tools": {
                    "listChanged": false
                }
            }),
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
            instructions: INSTRUCTIONS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug)]
struct ToolSpec {
    tool_name: &'static str,
    /// Reads after "Failed to" in error text
    action: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ListToolsResult {
    tools: Vec<ToolDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ToolResponse {
    content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "isError")]
    is_error: Option<bool>,
}

impl ToolResponse {
    fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }

    fn error(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: Some(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

fn tool_descriptors() -> Vec<ToolDescriptor> {
    tool_specs()
        .into_iter()
        .map(|spec| ToolDescriptor {
            name: spec.tool_name,
            description: spec.description,
            input_schema: spec.input_schema,
        })
        .collect()
}

fn find_tool_spec(name: &str) -> Option<ToolSpec> {
    tool_specs().into_iter().find(|spec| spec.tool_name == name)
}

fn view_and_user_properties() -> Value {
    json!({
        "view_name": {"type": "string", "default": "default", "description": "View name (defaults to 'default')"},
        "user_name": {"type": "string", "default": "mcp-user", "description": "User name for access control (defaults to 'mcp-user')"}
    })
}

fn filters_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "default": [],
        "description": description,
        "items": {
            "type": "object",
            "properties": {
                "field": {"type": "string"},
                "type": {"type": "string", "description": "eq|ne|gt|lt|gte|lte|in|regex"},
                "value": {}
            }
        }
    })
}

fn object_schema(mut properties: Value, required: &[&str]) -> Value {
    if let (Some(properties), Value::Object(common)) =
        (properties.as_object_mut(), view_and_user_properties())
    {
        properties.extend(common);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            tool_name: "datagroom_get_schema",
            action: "get schema for dataset",
            description: "Get schema information for a dataset including column names, types, and the total row count. \
                Use this first when working with a new dataset to understand its structure.",
            input_schema: object_schema(
                json!({
                    "dataset_name": {"type": "string", "description": "Dataset name"}
                }),
                &["dataset_name"],
            ),
        },
        ToolSpec {
            tool_name: "datagroom_query_dataset",
            action: "query dataset",
            description: "Query a dataset with filters and return matching rows. \
                Respects all ACLs (dataset-level and row-level permissions).",
            input_schema: object_schema(
                json!({
                    "dataset_name": {"type": "string", "description": "Dataset name"},
                    "filters": filters_schema(
                        "Array of filter objects: [{field: 'column_name', type: 'eq|ne|gt|lt|gte|lte|in|regex', value: filter_value}]"
                    ),
                    "sort_field": {"type": ["string", "null"], "description": "Field to sort by"},
                    "sort_direction": {"type": "string", "enum": ["asc", "desc"], "default": "asc", "description": "Sort direction: 'asc' or 'desc'"},
                    "max_rows": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 100, "description": "Maximum rows to return (max: 1000)"},
                    "offset": {"type": "integer", "minimum": 0, "default": 0, "description": "Number of rows to skip for pagination; rounded down to a multiple of max_rows"}
                }),
                &["dataset_name"],
            ),
        },
        ToolSpec {
            tool_name: "datagroom_aggregate_dataset",
            action: "aggregate dataset",
            description: "Perform aggregations on a dataset (count, sum, avg, min, max), optionally grouped by a field. \
                Computed over at most the first 10000 matching rows.",
            input_schema: object_schema(
                json!({
                    "dataset_name": {"type": "string", "description": "Dataset name"},
                    "aggregations": {
                        "type": "array",
                        "description": "List of aggregations: [{operation: 'count|sum|avg|min|max', field: 'column_name'}]",
                        "items": {
                            "type": "object",
                            "properties": {
                                "operation": {"type": "string", "enum": ["count", "sum", "avg", "min", "max"]},
                                "field": {"type": "string"}
                            },
                            "required": ["operation"]
                        }
                    },
                    "group_by": {"type": ["string", "null"], "description": "Field to group results by"},
                    "filters": filters_schema("Optional filters to apply before aggregation")
                }),
                &["dataset_name", "aggregations"],
            ),
        },
        ToolSpec {
            tool_name: "datagroom_list_datasets",
            action: "list datasets",
            description: "List all available datasets in Datagroom. \
                Use this to discover which datasets you have access to.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "user_name": {"type": "string", "default": "mcp-user", "description": "User name for access control (defaults to 'mcp-user')"}
                }
            }),
        },
        ToolSpec {
            tool_name: "datagroom_sample_dataset",
            action: "sample dataset",
            description: "Get the first rows of a dataset. \
                Useful for exploring data without knowing the structure.",
            input_schema: object_schema(
                json!({
                    "dataset_name": {"type": "string", "description": "Dataset name"},
                    "sample_size": {"type": "integer", "minimum": 1, "maximum": 100, "default": 20, "description": "Number of rows to sample (max: 100)"}
                }),
                &["dataset_name"],
            ),
        },
    ]
}
