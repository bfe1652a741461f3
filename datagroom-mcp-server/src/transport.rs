//! Serving loops: streamable-HTTP style `POST /mcp`, or newline-delimited stdio.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::post;
use axum::{Json, Router};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;

use crate::server::{DatagroomMcpServer, Response, ServerError};

/// Fixed local binding of the HTTP transport
pub const HTTP_BIND_ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8000));
pub const MCP_PATH: &str = "/mcp";

/// Router exposing the MCP endpoint
pub fn router(server: Arc<DatagroomMcpServer>) -> Router {
    Router::new()
        .route(MCP_PATH, post(handle_mcp))
        .with_state(server)
}

async fn handle_mcp(State(server): State<Arc<DatagroomMcpServer>>, body: String) -> HttpResponse {
    match server.handle_message(&body).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Serve MCP over HTTP until Ctrl-C
pub async fn serve_http(server: Arc<DatagroomMcpServer>, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server will be accessible at http://{}{MCP_PATH}", listener.local_addr()?);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

/// Serve MCP over stdin/stdout, one message per line, until stdin closes
pub async fn run_stdio(server: Arc<DatagroomMcpServer>) -> Result<(), ServerError> {
    let reader = BufReader::new(io::stdin());
    let mut writer = BufWriter::new(io::stdout());
    let mut lines = reader.lines();

    tracing::info!("serving MCP on stdio");

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(response) = server.handle_message(trimmed).await {
            write_response(&mut writer, &response).await?;
        }
    }

    Ok(())
}

async fn write_response(
    writer: &mut BufWriter<io::Stdout>,
    response: &Response,
) -> Result<(), ServerError> {
    let payload = serde_json::to_string(response).map_err(ServerError::Serialization)?;
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
