use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::models::{DatasetList, ViewColumns, ViewPage, ViewQuery};

/// Fixed timeout applied to every Gateway request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// # Gateway Client
///
/// Async client for the Datagroom Gateway. Every request carries the personal
/// access token as a bearer credential; access control is enforced by the
/// Gateway for the user name passed in the path.
///
/// ## Usage
///
/// ```rust,no_run
/// use datagroom_gateway::{GatewayClient, GatewayConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = GatewayConfig::new("http://localhost:8887", "dgpat_example");
///     let client = GatewayClient::new(config)?;
///
///     let datasets = client.dataset_list("mcp-user").await?;
///     println!("{} datasets visible", datasets.db_list.len());
///
///     Ok(())
/// }
/// ```
///
/// Requests are never retried, and no connection is kept alive between calls.
pub struct GatewayClient {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.config.base_url())
            .finish()
    }
}

impl GatewayClient {
    /// Create a client for a validated configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .user_agent(concat!("datagroom-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Issue an authenticated `GET` and return the parsed JSON body
    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        let url = self.config.url(endpoint);
        tracing::info!("GET {url}");

        let request = self.request(reqwest::Method::GET, &url);
        self.send(request, url).await
    }

    /// Issue an authenticated `POST` with an optional JSON body and query parameters
    pub async fn post<B, Q>(&self, endpoint: &str, body: Option<&B>, query: Option<&Q>) -> Result<Value>
    where
        B: Serialize + ?Sized,
        Q: Serialize + ?Sized,
    {
        let url = self.config.url(endpoint);
        tracing::info!("POST {url}");

        let mut request = self.request(reqwest::Method::POST, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(query) = query {
            request = request.query(query);
        }
        self.send(request, url).await
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token()))
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: String) -> Result<Value> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Status {
                status: status.as_u16(),
                url,
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // === Typed endpoints ===
    // Names are percent-encoded so each one stays a single path segment.

    /// Column metadata for a view
    pub async fn view_columns(&self, dataset: &str, view: &str, user: &str) -> Result<ViewColumns> {
        let endpoint = format!(
            "/ds/view/columns/{}/{}/{}",
            urlencoding::encode(dataset),
            urlencoding::encode(view),
            urlencoding::encode(user)
        );
        decode(self.get(&endpoint).await?)
    }

    /// One page of rows from a view, filtered and sorted by the Gateway
    pub async fn view_via_post(
        &self,
        dataset: &str,
        view: &str,
        user: &str,
        query: &ViewQuery,
    ) -> Result<ViewPage> {
        let endpoint = format!(
            "/ds/viewViaPost/{}/{}/{}",
            urlencoding::encode(dataset),
            urlencoding::encode(view),
            urlencoding::encode(user)
        );
        decode(self.post(&endpoint, Some(query), None::<&()>).await?)
    }

    /// Datasets visible to a user
    pub async fn dataset_list(&self, user: &str) -> Result<DatasetList> {
        let endpoint = format!("/ds/dsList/{}", urlencoding::encode(user));
        decode(self.get(&endpoint).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}
