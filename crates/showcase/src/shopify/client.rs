//! HTTP transport for the Shopify Admin API.

use std::sync::Arc;
use std::time::Duration;

use graphql_client::QueryBody;
use products_showcase_core::{ApiVersion, ShopDomain};
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::ShopifyError;
use super::queries::RestApiVersions;
use crate::config::ShopifyConfig;
use crate::db::ApiCredentials;

/// Timeout for ordinary GraphQL reads and the code exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the connection status probe.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for API version detection requests.
pub const VERSION_DETECTION_TIMEOUT: Duration = Duration::from_secs(15);

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const OAUTH_SCOPE: &str = "read_products";

/// Access token returned by the code exchange.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    pub scope: String,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Shopify Admin API client.
///
/// Holds no credentials; callers pass the shop and token for each request.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    http: reqwest::Client,
    api_origin: Option<String>,
}

impl AdminClient {
    /// Create a new Admin API client.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("products-showcase/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                http,
                api_origin: config.api_origin.clone(),
            }),
        })
    }

    /// Origin used for API calls to `shop`.
    fn origin(&self, shop: &ShopDomain) -> String {
        self.inner
            .api_origin
            .clone()
            .unwrap_or_else(|| shop.base_url())
    }

    // =========================================================================
    // OAuth
    // =========================================================================

    /// The authorization URL the merchant is sent to.
    #[must_use]
    pub fn authorization_url(
        &self,
        shop: &ShopDomain,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
    ) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("scope", OAUTH_SCOPE)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state)
            .finish();
        format!("{}/admin/oauth/authorize?{query}", shop.base_url())
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::OAuth` with Shopify's `error_description` (or
    /// `error`) on a non-200 response or when no token is returned, and
    /// `ShopifyError::Transport` if the request fails.
    #[instrument(skip(self, client_secret, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        client_id: &str,
        client_secret: &SecretString,
        code: &str,
    ) -> Result<TokenGrant, ShopifyError> {
        let url = format!("{}/admin/oauth/access_token", self.origin(shop));

        let response = self
            .inner
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&json!({
                "client_id": client_id,
                "client_secret": client_secret.expose_secret(),
                "code": code,
            }))
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if status != reqwest::StatusCode::OK {
            let message = ["error_description", "error"]
                .iter()
                .find_map(|field| body.get(*field).and_then(Value::as_str))
                .unwrap_or("Unknown error from Shopify");
            warn!(status = status.as_u16(), "Token exchange rejected");
            return Err(ShopifyError::OAuth(message.to_string()));
        }

        let access_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ShopifyError::OAuth("No access token received from Shopify.".to_string())
            })?;

        Ok(TokenGrant {
            access_token: SecretString::from(access_token.to_string()),
            scope: body
                .get("scope")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation with stored credentials.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute_at`].
    pub async fn execute<T: DeserializeOwned>(
        &self,
        credentials: &ApiCredentials,
        body: &QueryBody<Value>,
        timeout: Duration,
    ) -> Result<T, ShopifyError> {
        self.execute_at(
            &credentials.shop,
            &credentials.access_token,
            &credentials.api_version,
            body,
            timeout,
        )
        .await
    }

    /// Execute a GraphQL operation against a specific API version.
    ///
    /// # Errors
    ///
    /// - `ShopifyError::Transport` if the request fails or times out
    /// - `ShopifyError::Http` on a non-200 status
    /// - `ShopifyError::InvalidJson` if the body is not JSON or `data` does not
    ///   match `T`
    /// - `ShopifyError::GraphQL` with the first error message when the
    ///   response has a top-level `errors` entry
    #[instrument(skip(self, access_token, body), fields(shop = %shop, version = %version, operation = body.operation_name))]
    pub async fn execute_at<T: DeserializeOwned>(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        version: &ApiVersion,
        body: &QueryBody<Value>,
        timeout: Duration,
    ) -> Result<T, ShopifyError> {
        let endpoint = format!(
            "{}/admin/api/{}/graphql.json",
            self.origin(shop),
            version.as_str()
        );

        let response = self
            .inner
            .http
            .post(&endpoint)
            .header(ACCESS_TOKEN_HEADER, access_token.expose_secret())
            .json(body)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ShopifyError::Http(status.as_u16()));
        }

        let text = response.text().await?;
        let mut envelope: Value =
            serde_json::from_str(&text).map_err(|_| ShopifyError::InvalidJson)?;

        if let Some(errors) = envelope.get("errors").filter(|errors| !errors.is_null()) {
            let message = errors
                .get(0)
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown GraphQL error")
                .to_string();
            warn!(%message, "GraphQL error response");
            return Err(ShopifyError::GraphQL { message });
        }

        let data = envelope
            .get_mut("data")
            .map(Value::take)
            .filter(|data| !data.is_null())
            .ok_or_else(|| ShopifyError::GraphQL {
                message: "No data in response".to_string(),
            })?;

        serde_json::from_value(data).map_err(|e| {
            warn!(error = %e, "GraphQL data did not match the expected shape");
            ShopifyError::InvalidJson
        })
    }

    // =========================================================================
    // REST
    // =========================================================================

    /// List API versions via the REST `/admin/api.json` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Transport`, `ShopifyError::Http` or
    /// `ShopifyError::InvalidJson`.
    #[instrument(skip(self, access_token), fields(shop = %shop))]
    pub async fn rest_api_versions(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<RestApiVersions, ShopifyError> {
        let url = format!("{}/admin/api.json", self.origin(shop));

        let response = self
            .inner
            .http
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, access_token.expose_secret())
            .header(ACCEPT, "application/json")
            .timeout(VERSION_DETECTION_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ShopifyError::Http(status.as_u16()));
        }

        let text = response.text().await?;
        let versions: RestApiVersions =
            serde_json::from_str(&text).map_err(|_| ShopifyError::InvalidJson)?;
        debug!(count = versions.supported_api_versions.len(), "REST API versions");
        Ok(versions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url() {
        let client = AdminClient::new(&ShopifyConfig::default()).unwrap();
        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        let url = client.authorization_url(
            &shop,
            "abc123",
            "https://showcase.test/oauth/callback",
            "n0nce",
        );

        assert_eq!(
            url,
            "https://demo.myshopify.com/admin/oauth/authorize?client_id=abc123&scope=read_products\
             &redirect_uri=https%3A%2F%2Fshowcase.test%2Foauth%2Fcallback&state=n0nce"
        );
    }

    #[test]
    fn test_origin_override() {
        let config = ShopifyConfig {
            api_origin: Some("http://127.0.0.1:9999".to_string()),
            ..ShopifyConfig::default()
        };
        let client = AdminClient::new(&config).unwrap();
        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        assert_eq!(client.origin(&shop), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_token_grant_debug_redacts() {
        let grant = TokenGrant {
            access_token: SecretString::from("shpat_secret"),
            scope: "read_products".to_string(),
        };
        assert!(!format!("{grant:?}").contains("shpat_secret"));
    }
}
