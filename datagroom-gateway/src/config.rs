use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};

/// Environment variable holding the personal access token
pub const TOKEN_VAR: &str = "DATAGROOM_PAT_TOKEN";
/// Environment variable holding the Gateway base URL
pub const GATEWAY_URL_VAR: &str = "DATAGROOM_GATEWAY_URL";
/// Base URL used when neither the environment nor the config file names one
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8887";
/// Key of this server's block under `mcpServers` in `mcp.json`
pub const MCP_SERVER_KEY: &str = "datagroom";

/// Location of the MCP client configuration file (`~/.cursor/mcp.json`)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cursor").join("mcp.json"))
}

/// Configuration as resolved from the environment and `mcp.json`, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConfig {
    /// Gateway base URL, already defaulted
    pub base_url: String,
    /// Personal access token, if one was found anywhere
    pub token: Option<String>,
}

impl RawConfig {
    /// Resolve against the process environment and the default `mcp.json`
    pub fn from_env() -> Self {
        Self::from_env_with_file(default_config_file().as_deref())
    }

    /// Resolve against the process environment and an explicit `mcp.json` path
    pub fn from_env_with_file(config_file: Option<&Path>) -> Self {
        Self::resolve(|name| env::var(name).ok(), config_file)
    }

    /// Resolve configuration values.
    ///
    /// Environment values win over the file; the file is only read when the
    /// environment leaves something unset. Empty strings count as unset.
    /// Anything wrong with the file (missing, unreadable, malformed, wrong
    /// shape) just means it contributes nothing.
    pub fn resolve<F>(lookup: F, config_file: Option<&Path>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_token = non_empty(lookup(TOKEN_VAR));
        let env_url = non_empty(lookup(GATEWAY_URL_VAR));

        let file_env = match (&env_token, &env_url, config_file) {
            (Some(_), Some(_), _) | (_, _, None) => Map::new(),
            (_, _, Some(path)) => read_server_env(path),
        };
        let from_file = |name: &str| {
            non_empty(
                file_env
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            )
        };

        let token = env_token.or_else(|| from_file(TOKEN_VAR));
        let base_url = env_url
            .or_else(|| from_file(GATEWAY_URL_VAR))
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_owned());

        Self { base_url, token }
    }

    /// Check that a token is present.
    ///
    /// The returned [`GatewayConfig`] always carries a token, so validation
    /// never needs repeating.
    pub fn validate(self) -> Result<GatewayConfig> {
        match self.token {
            Some(token) => Ok(GatewayConfig {
                base_url: self.base_url,
                token,
            }),
            None => Err(GatewayError::config_error(format!(
                "{TOKEN_VAR} is required. Set it in the environment or in Cursor's mcp.json under \
                 mcpServers.{MCP_SERVER_KEY}.env (e.g. \"env\": {{\"{TOKEN_VAR}\": \"dgpat_...\", \
                 \"{GATEWAY_URL_VAR}\": \"{DEFAULT_GATEWAY_URL}\"}}). \
                 Generate a token in Datagroom Settings > Personal Access Tokens"
            ))),
        }
    }
}

/// Validated Gateway configuration
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    base_url: String,
    token: String,
}

impl GatewayConfig {
    /// Build a configuration directly
    pub fn new<U: Into<String>, T: Into<String>>(base_url: U, token: T) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Resolve from the environment and `~/.cursor/mcp.json`, then validate
    pub fn load() -> Result<Self> {
        RawConfig::from_env().validate()
    }

    /// Resolve from the environment and the given `mcp.json`, then validate
    pub fn load_from(config_file: &Path) -> Result<Self> {
        RawConfig::from_env_with_file(Some(config_file)).validate()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Full URL for a Gateway endpoint such as `/ds/dsList/alice`
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Read `mcpServers.datagroom.env` from an `mcp.json` file
fn read_server_env(path: &Path) -> Map<String, Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!(path = %path.display(), "config file not readable: {err}");
            return Map::new();
        }
    };

    let document: Value = match serde_json::from_str(&text) {
        Ok(document) => document,
        Err(err) => {
            tracing::debug!(path = %path.display(), "config file is not valid JSON: {err}");
            return Map::new();
        }
    };

    document
        .get("mcpServers")
        .and_then(|servers| servers.get(MCP_SERVER_KEY))
        .and_then(|server| server.get("env"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
