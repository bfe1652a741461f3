use datagroom_gateway::{GatewayClient, GatewayConfig};
use std::env;

/// Dump the raw JSON the Gateway returns for a user's dataset listing.
///
/// Usage: `cargo run --example raw_response -- [user]`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let user = env::args().nth(1).unwrap_or_else(|| "mcp-user".to_string());

    let config = GatewayConfig::load()?;
    let client = GatewayClient::new(config)?;

    let json = client.get(&format!("/ds/dsList/{user}")).await?;
    println!("Raw JSON structure:");
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(())
}
