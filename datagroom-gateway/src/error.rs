use thiserror::Error;

/// Errors that can occur when talking to the Datagroom Gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Required configuration is missing
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network, timeout, or other request-level failure
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Gateway answered with a non-success status code
    #[error("Gateway returned HTTP {status} for {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    /// The response body was not the JSON we expected
    #[error("Invalid Gateway response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl GatewayError {
    /// Create a new configuration error
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status code, when the Gateway produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Type alias for Results using GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;
