pub mod client;
pub mod config;
pub mod error;
pub mod models;

// Re-export the client and configuration for easy access
pub use client::{GatewayClient, REQUEST_TIMEOUT};
pub use config::{DEFAULT_GATEWAY_URL, GatewayConfig, RawConfig};
pub use error::{GatewayError, Result};
