use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use datagroom_gateway::GatewayConfig;
use datagroom_mcp_server::transport::{self, HTTP_BIND_ADDR};
use datagroom_mcp_server::{DatagroomMcpServer, ServerError};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// POST /mcp on 127.0.0.1:8000
    Http,
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
}

/// MCP server for Datagroom datasets
#[derive(Debug, Parser)]
#[command(name = "datagroom-mcp-server", version, about)]
struct Cli {
    #[arg(long, value_enum, env = "DATAGROOM_MCP_TRANSPORT", default_value_t = Transport::Http)]
    transport: Transport,

    /// Read the token and Gateway URL from this mcp.json instead of ~/.cursor/mcp.json
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let config = match &cli.config {
        Some(path) => GatewayConfig::load_from(path)?,
        None => GatewayConfig::load()?,
    };

    tracing::info!("Starting Datagroom MCP Server...");
    tracing::info!("Gateway URL: {}", config.base_url());

    let server = Arc::new(DatagroomMcpServer::from_config(config)?);

    match cli.transport {
        Transport::Http => transport::serve_http(server, HTTP_BIND_ADDR).await,
        Transport::Stdio => transport::run_stdio(server).await,
    }
}
