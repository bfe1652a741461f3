mod common;

use common::{mount_view, tools_for};
use datagroom_mcp_server::ToolError;
use datagroom_mcp_server::tools::{AggregateArgs, ListArgs, QueryArgs, SampleArgs, SchemaArgs};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn args<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("arguments should parse")
}

fn numbered_rows(count: usize) -> Value {
    Value::Array((0..count).map(|i| json!({"_id": i, "n": i})).collect())
}

/// Test that schema merges column metadata with the row count
#[tokio::test]
async fn test_get_schema() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ds/view/columns/sales/default/mcp-user"))
        .and(header("authorization", "Bearer dgpat_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "columns": {"10": "notes", "2": "amount", "1": "region"},
            "columnAttrs": [
                {"field": "amount", "editor": "number", "width": 80},
                {"field": "notes", "editor": null}
            ],
            "keys": ["region"]
        })))
        .expect(1)
        .mount(&gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/ds/viewViaPost/sales/default/mcp-user"))
        .and(body_json(json!({"filters": [], "page": 1, "per_page": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "total": 1234})))
        .expect(1)
        .mount(&gateway)
        .await;

    let tools = tools_for(&gateway);
    let text = tools
        .get_schema(args::<SchemaArgs>(json!({"dataset_name": "sales"})))
        .await
        .unwrap();

    assert_eq!(
        text,
        "# Dataset: sales\n\n**Total Rows**: 1234\n\n## Columns\n\n\
         ### region\n- **Type**: string\n\n\
         ### amount\n- **Type**: number\n\n\
         ### notes\n- **Type**: string\n"
    );
}

/// Test the page arithmetic, the sorter and the truncation warning
#[tokio::test]
async fn test_query_dataset_pages_and_warns() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ds/viewViaPost/tickets/open/alice"))
        .and(body_json(json!({
            "filters": [{"field": "status", "type": "eq", "value": "open"}],
            "page": 2,
            "per_page": 100,
            "sorters": [{"field": "created", "dir": "desc"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": numbered_rows(100), "total": 500})),
        )
        .expect(1)
        .mount(&gateway)
        .await;

    let tools = tools_for(&gateway);
    let text = tools
        .query_dataset(args::<QueryArgs>(json!({
            "dataset_name": "tickets",
            "filters": [{"field": "status", "type": "eq", "value": "open"}],
            "sort_field": "created",
            "sort_direction": "desc",
            "max_rows": 100,
            "offset": 150,
            "view_name": "open",
            "user_name": "alice"
        })))
        .await
        .unwrap();

    assert!(text.starts_with("# Dataset: tickets\n\n**Total Matching Rows**: 500\n**Rows Returned**: 100\n**Offset**: 150"));
    assert!(text.contains("- `status` eq `open`"));
    // the table itself shows at most 50 rows
    assert!(text.contains("_(Showing first 50 of 100 rows)_"));
    assert!(text.ends_with(
        "\n\n⚠️ **Warning**: 500 rows match your filters, but only returning first 100. \
         Use offset parameter or refine filters.\n"
    ));
}

/// Test that no sorter is sent and no warning is added for a complete result
#[tokio::test]
async fn test_query_dataset_without_sort() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ds/viewViaPost/tickets/default/mcp-user"))
        .and(body_json(json!({"filters": [], "page": 1, "per_page": 100})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [{"_id": "x", "title": "Broken"}], "total": 1})),
        )
        .expect(1)
        .mount(&gateway)
        .await;

    let tools = tools_for(&gateway);
    let text = tools
        .query_dataset(args::<QueryArgs>(json!({"dataset_name": "tickets"})))
        .await
        .unwrap();

    assert!(text.ends_with("| title |\n| --- |\n| Broken |"));
    assert!(!text.contains("Warning"));
}

/// Test that an out-of-range page size is rejected before calling the Gateway
#[tokio::test]
async fn test_query_dataset_rejects_max_rows() {
    let gateway = MockServer::start().await;
    let tools = tools_for(&gateway);

    let err = tools
        .query_dataset(args::<QueryArgs>(json!({"dataset_name": "tickets", "max_rows": 5000})))
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::InvalidArgument { .. }));
    assert!(gateway.received_requests().await.unwrap().is_empty());
}

/// Test that a failing Gateway call becomes a typed tool error
#[tokio::test]
async fn test_gateway_failure_is_a_tool_error() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&gateway)
        .await;

    let tools = tools_for(&gateway);
    let err = tools
        .query_dataset(args::<QueryArgs>(json!({"dataset_name": "tickets"})))
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::Gateway { .. }));
    let message = err.to_string();
    assert!(message.starts_with("Failed to query dataset 'tickets'."));
    assert!(message.contains("500"));
}

/// Test grouped aggregation over the capped fetch
#[tokio::test]
async fn test_aggregate_dataset_grouped() {
    let gateway = MockServer::start().await;
    mount_view(
        &gateway,
        "sales",
        json!({"page": 1, "per_page": 10000, "filters": [{"field": "year", "type": "eq", "value": 2024}]}),
        json!({
            "data": [
                {"_id": 1, "category": "a", "amount": 10},
                {"_id": 2, "amount": 5},
                {"_id": 3, "category": "a", "amount": "n/a"},
                {"_id": 4, "category": "a", "amount": 2}
            ],
            "total": 4
        }),
    )
    .await;

    let tools = tools_for(&gateway);
    let text = tools
        .aggregate_dataset(args::<AggregateArgs>(json!({
            "dataset_name": "sales",
            "aggregations": [{"operation": "count"}, {"operation": "sum", "field": "amount"}],
            "group_by": "category",
            "filters": [{"field": "year", "type": "eq", "value": 2024}]
        })))
        .await
        .unwrap();

    assert_eq!(
        text,
        "# Aggregation Results\n\n\
         ## Result 1\n- **group**: a\n- **count**: 3\n- **sum_amount**: 12\n\n\
         ## Result 2\n- **group**: null\n- **count**: 1\n- **sum_amount**: 5\n"
    );
}

/// Test the message for an aggregation with nothing to aggregate
#[tokio::test]
async fn test_aggregate_dataset_without_rows() {
    let gateway = MockServer::start().await;
    mount_view(&gateway, "sales", json!({"per_page": 10000}), json!({"data": [], "total": 0})).await;

    let tools = tools_for(&gateway);
    let text = tools
        .aggregate_dataset(args::<AggregateArgs>(json!({
            "dataset_name": "sales",
            "aggregations": [{"operation": "count"}]
        })))
        .await
        .unwrap();

    assert_eq!(text, "No data found in dataset 'sales' with the given filters.");
}

/// Test that an empty listing yields the no-access message
#[tokio::test]
async fn test_list_datasets_empty() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ds/dsList/mcp-user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dbList": []})))
        .mount(&gateway)
        .await;

    let tools = tools_for(&gateway);
    let text = tools.list_datasets(ListArgs::default()).await.unwrap();

    assert_eq!(text, "No datasets found. You may not have access to any datasets.");
}

/// Test listing with both detailed and bare entries
#[tokio::test]
async fn test_list_datasets() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ds/dsList/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dbList": [
                {"name": "sales", "sizeOnDisk": 3145728, "perms": {"owner": "bob"}},
                "archive"
            ]
        })))
        .mount(&gateway)
        .await;

    let tools = tools_for(&gateway);
    let text = tools
        .list_datasets(args::<ListArgs>(json!({"user_name": "alice"})))
        .await
        .unwrap();

    assert_eq!(
        text,
        "# Available Datasets\n\n- **sales** (Size: 3.00 MB, Owner: bob)\n- archive"
    );
}

/// Test sampling: first rows only, header counts the rows returned
#[tokio::test]
async fn test_sample_dataset() {
    let gateway = MockServer::start().await;
    mount_view(
        &gateway,
        "sales",
        json!({"filters": [], "page": 1, "per_page": 2}),
        json!({"data": [{"_id": 1, "region": "EU"}, {"_id": 2, "region": "US"}], "total": 90}),
    )
    .await;

    let tools = tools_for(&gateway);
    let text = tools
        .sample_dataset(args::<SampleArgs>(json!({"dataset_name": "sales", "sample_size": 2})))
        .await
        .unwrap();

    assert_eq!(
        text,
        "# Sample from sales\n\n**Total rows in dataset**: 90\n**Sample size**: 2\n\n\
         | region |\n| --- |\n| EU |\n| US |"
    );
}

/// Test the message for an empty or inaccessible dataset
#[tokio::test]
async fn test_sample_dataset_empty() {
    let gateway = MockServer::start().await;
    mount_view(&gateway, "secret", json!({"per_page": 20}), json!({"data": [], "total": 0})).await;

    let tools = tools_for(&gateway);
    let text = tools
        .sample_dataset(args::<SampleArgs>(json!({"dataset_name": "secret"})))
        .await
        .unwrap();

    assert_eq!(text, "Dataset 'secret' is empty or you don't have access.");
}
