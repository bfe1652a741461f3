#![allow(dead_code)]

use std::sync::Arc;

use datagroom_gateway::{GatewayClient, GatewayConfig};
use datagroom_mcp_server::{DatagroomMcpServer, DatagroomTools};
use serde_json::Value;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "dgpat_test";

pub fn tools_for(gateway: &MockServer) -> DatagroomTools {
    let config = GatewayConfig::new(gateway.uri(), TOKEN);
    DatagroomTools::new(GatewayClient::new(config).expect("client should build"))
}

pub fn server_for(gateway: &MockServer) -> Arc<DatagroomMcpServer> {
    Arc::new(DatagroomMcpServer::new(tools_for(gateway)))
}

/// Answer `POST /ds/viewViaPost/{dataset}/default/mcp-user` bodies matching `body` with `response`
pub async fn mount_view(gateway: &MockServer, dataset: &str, body: Value, response: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/ds/viewViaPost/{dataset}/default/mcp-user")))
        .and(body_partial_json(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(gateway)
        .await;
}
