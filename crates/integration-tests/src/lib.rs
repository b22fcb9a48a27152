//! Integration test harness for the products showcase service.
//!
//! Each test spawns the real application on a random local port, wired to a
//! [`FakeShopify`] server that answers the Admin API operations the service
//! sends. Settings live in memory, so no database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p products-showcase-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use products_showcase::config::ShopifyConfig;
use products_showcase::db::MemorySettingsStore;
use products_showcase::{AppState, ShowcaseConfig};
use products_showcase_core::{ApiVersion, ShopDomain};
use reqwest::{Client, RequestBuilder, redirect::Policy};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const ADMIN_TOKEN: &str = "integration-admin-token-0123456789abcdef";
pub const EDITOR_TOKEN: &str = "integration-editor-token-0123456789abcdef";

/// Shop the connected fixtures are stored for.
pub const SHOP: &str = "demo-store.myshopify.com";
/// Access token the fake accepts and issues.
pub const ACCESS_TOKEN: &str = "shpat_integration";
/// Authorization code the fake exchanges successfully.
pub const GOOD_CODE: &str = "good-code";
/// Newest stable version the fake advertises.
pub const DETECTED_VERSION: &str = "2026-01";
pub const SHOP_NAME: &str = "Demo Store";
/// Hit counter key for the REST `/admin/api.json` listing.
pub const REST_VERSIONS: &str = "api.json";

// =============================================================================
// Fake Shopify
// =============================================================================

#[derive(Default)]
struct FakeState {
    hits: Mutex<HashMap<String, usize>>,
    versions: Mutex<Vec<String>>,
    fail_with: Mutex<Option<String>>,
    failing_operations: Mutex<HashSet<String>>,
    rest_versions_down: Mutex<bool>,
}

/// Local stand-in for a store's Admin API.
///
/// Counts GraphQL requests per operation name, and REST version listings
/// under [`REST_VERSIONS`], so tests can tell cache hits from upstream calls.
#[derive(Clone)]
pub struct FakeShopify {
    origin: String,
    state: Arc<FakeState>,
}

impl FakeShopify {
    /// Start the fake on a random port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState::default());
        let router = Router::new()
            .route("/admin/api/{version}/graphql.json", post(graphql))
            .route("/admin/oauth/access_token", post(access_token))
            .route("/admin/api.json", get(rest_versions))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake Shopify");
        let addr = listener.local_addr().expect("fake Shopify address");
        tokio::spawn(async move { axum::serve(listener, router).await });

        Self {
            origin: format!("http://{addr}"),
            state,
        }
    }

    /// Origin the service should call instead of `https://{shop}`.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Requests received for a GraphQL `operation` or [`REST_VERSIONS`].
    pub async fn hits(&self, operation: &str) -> usize {
        self.state
            .hits
            .lock()
            .await
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    /// API version path segment of the latest GraphQL request.
    pub async fn last_version(&self) -> Option<String> {
        self.state.versions.lock().await.last().cloned()
    }

    /// Answer every following GraphQL request with a top-level error.
    pub async fn fail_with(&self, message: &str) {
        *self.state.fail_with.lock().await = Some(message.to_string());
    }

    /// Answer only `operation` with a top-level error.
    pub async fn fail_operation(&self, operation: &str) {
        self.state
            .failing_operations
            .lock()
            .await
            .insert(operation.to_string());
    }

    /// Answer the REST version listing with a server error.
    pub async fn fail_rest_versions(&self) {
        *self.state.rest_versions_down.lock().await = true;
    }
}

async fn graphql(
    State(state): State<Arc<FakeState>>,
    Path(version): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let operation = body["operationName"].as_str().unwrap_or_default().to_string();
    *state.hits.lock().await.entry(operation.clone()).or_default() += 1;
    state.versions.lock().await.push(version);

    let authorized = headers
        .get("x-shopify-access-token")
        .and_then(|value| value.to_str().ok())
        == Some(ACCESS_TOKEN);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "errors": "[API] Invalid API key or access token" })),
        )
            .into_response();
    }

    if let Some(message) = state.fail_with.lock().await.clone() {
        return Json(json!({ "errors": [{ "message": message }] })).into_response();
    }
    if state.failing_operations.lock().await.contains(&operation) {
        return Json(json!({ "errors": [{ "message": format!("{operation} unavailable") }] }))
            .into_response();
    }

    let variables = &body["variables"];
    let data = match operation.as_str() {
        "ShopName" => json!({ "shop": { "name": SHOP_NAME } }),
        "PublicApiVersions" => json!({
            "publicApiVersions": [
                { "handle": "2025-07", "supported": true },
                { "handle": DETECTED_VERSION, "supported": true },
                { "handle": "unstable", "supported": false },
            ]
        }),
        "SearchProducts" => json!({
            "products": { "edges": [
                { "node": product_summary("1", "Linen Shirt", "linen-shirt") },
                { "node": product_summary("2", "Linen Trousers", "linen-trousers") },
            ]}
        }),
        "SearchCollections" => {
            let document = body["query"].as_str().unwrap_or_default();
            let count = if document.contains("productsCount {") {
                json!({ "count": 4 })
            } else {
                json!(4)
            };
            json!({
                "collections": { "edges": [{ "node": {
                    "id": "gid://shopify/Collection/77",
                    "title": "Summer Sale",
                    "handle": "summer-sale",
                    "image": null,
                    "productsCount": count,
                }}]}
            })
        }
        "Product" => {
            let id = variables["id"].as_str().unwrap_or_default();
            if id.ends_with("/404") {
                json!({ "product": null })
            } else {
                let number = id.rsplit('/').next().unwrap_or_default();
                json!({ "product": product_node(
                    id,
                    &format!("Product {number}"),
                    &format!("product-{number}"),
                    "ACTIVE",
                )})
            }
        }
        "Collection" => {
            let id = variables["id"].as_str().unwrap_or_default();
            if id.ends_with("/404") {
                json!({ "collection": null })
            } else {
                json!({ "collection": {
                    "id": id,
                    "title": "Summer Sale",
                    "handle": "summer-sale",
                    "image": { "url": "https://cdn.example/summer-sale.jpg" },
                }})
            }
        }
        "CollectionProducts" => json!({
            "collection": { "products": { "edges": [
                { "node": product_node("gid://shopify/Product/11", "Linen Shirt", "linen-shirt", "ACTIVE") },
                { "node": product_node("gid://shopify/Product/12", "Hidden Draft", "hidden-draft", "DRAFT") },
            ]}}
        }),
        _ => {
            return Json(json!({ "errors": [{ "message": format!("Unknown operation {operation}") }] }))
                .into_response();
        }
    };

    Json(json!({ "data": data })).into_response()
}

async fn access_token(Json(body): Json<Value>) -> Response {
    if body["code"].as_str() == Some(GOOD_CODE) {
        Json(json!({ "access_token": ACCESS_TOKEN, "scope": "read_products" })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_request",
                "error_description": "The authorization code was not found or was already used",
            })),
        )
            .into_response()
    }
}

async fn rest_versions(State(state): State<Arc<FakeState>>) -> Response {
    *state
        .hits
        .lock()
        .await
        .entry(REST_VERSIONS.to_string())
        .or_default() += 1;

    if *state.rest_versions_down.lock().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "errors": "Internal Server Error" })),
        )
            .into_response();
    }

    Json(json!({
        "supported_api_versions": [
            { "handle": "2025-07", "supported": true, "latest_supported": false },
            { "handle": DETECTED_VERSION, "supported": true, "latest_supported": true },
            { "handle": "unstable", "supported": false, "latest_supported": false },
        ]
    }))
    .into_response()
}

fn product_summary(number: &str, title: &str, handle: &str) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{number}"),
        "title": title,
        "handle": handle,
        "featuredImage": { "url": format!("https://cdn.example/{handle}-thumb.jpg") },
        "priceRangeV2": { "minVariantPrice": { "amount": "19.0", "currencyCode": "USD" } },
    })
}

fn product_node(id: &str, title: &str, handle: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "handle": handle,
        "description": format!("{title} in natural fibres."),
        "productType": "Apparel",
        "hasOutOfStockVariants": false,
        "status": status,
        "priceRangeV2": { "minVariantPrice": { "amount": "19.0", "currencyCode": "USD" } },
        "options": [{
            "id": "gid://shopify/ProductOption/1",
            "name": "Color",
            "optionValues": [
                { "name": "Sand", "swatch": { "color": "#d8c8a8", "image": null } },
                { "name": "Olive", "swatch": null },
            ],
        }],
        "images": { "edges": [
            { "node": {
                "id": "gid://shopify/ProductImage/1",
                "url": format!("https://cdn.example/{handle}.jpg"),
                "altText": title,
            }},
        ]},
        "variants": { "edges": [
            { "node": {
                "id": "gid://shopify/ProductVariant/1",
                "title": "Sand",
                "price": "19.0",
                "compareAtPrice": null,
                "sku": null,
                "image": null,
                "selectedOptions": [{ "name": "Color", "value": "Sand" }],
            }},
        ]},
    })
}

// =============================================================================
// Test App
// =============================================================================

/// The showcase service running against a [`FakeShopify`].
pub struct TestApp {
    pub address: SocketAddr,
    pub state: AppState,
    pub shopify: FakeShopify,
    client: Client,
}

impl TestApp {
    /// Start an app with no store connected.
    ///
    /// # Panics
    ///
    /// Panics if the servers cannot start.
    pub async fn spawn() -> Self {
        let shopify = FakeShopify::spawn().await;
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind showcase");
        let address = listener.local_addr().expect("showcase address");

        let config = ShowcaseConfig {
            host: address.ip(),
            port: address.port(),
            base_url: format!("http://{address}"),
            database_url: None,
            admin_token: SecretString::from(ADMIN_TOKEN),
            editor_token: SecretString::from(EDITOR_TOKEN),
            shopify: ShopifyConfig {
                api_version_fallback: ApiVersion::fallback(),
                api_origin: Some(shopify.origin().to_string()),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config, Arc::new(MemorySettingsStore::new()))
            .expect("build app state");
        let app = products_showcase::app(state.clone());
        tokio::spawn(async move { axum::serve(listener, app).await });

        Self {
            address,
            state,
            shopify,
            client: client(false),
        }
    }

    /// Start an app whose store is already connected.
    ///
    /// # Panics
    ///
    /// Panics if the servers cannot start or the credentials cannot be stored.
    pub async fn spawn_connected() -> Self {
        let app = Self::spawn().await;
        let shop = ShopDomain::parse(SHOP).expect("valid shop");
        app.state
            .settings()
            .save_app_credentials(&shop, "client-id", &SecretString::from("client-secret"))
            .await
            .expect("store app credentials");
        app.state
            .settings()
            .save_access_token(&SecretString::from(ACCESS_TOKEN))
            .await
            .expect("store access token");
        app
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.address)
    }

    /// GET with a bearer token; redirects are not followed.
    #[must_use]
    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    /// POST with a bearer token; redirects are not followed.
    #[must_use]
    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    /// Unauthenticated client without redirects.
    #[must_use]
    pub fn anonymous(&self) -> &Client {
        &self.client
    }

    /// Client that keeps cookies, like a browser using the settings UI.
    #[must_use]
    pub fn browser() -> Client {
        client(true)
    }

    /// HTML of the settings page, consuming any pending notice.
    ///
    /// # Panics
    ///
    /// Panics if the page cannot be fetched.
    pub async fn settings_page(&self) -> String {
        let response = self
            .get("/admin/settings", ADMIN_TOKEN)
            .send()
            .await
            .expect("fetch settings page");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.text().await.expect("settings page body")
    }
}

fn client(cookies: bool) -> Client {
    Client::builder()
        .redirect(Policy::none())
        .cookie_store(cookies)
        .build()
        .expect("Failed to create HTTP client")
}
