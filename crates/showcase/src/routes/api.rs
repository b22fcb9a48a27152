//! JSON API for the block editor and admin tooling.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::cache::SHOPIFY_PREFIX;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireEditor};
use crate::render::{BlockAttributes, RenderMode};
use crate::shopify::{CollectionInfo, CollectionSummary, ProductDetail, ProductSummary};
use crate::state::AppState;

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        // Editor
        .route("/connection-status", get(connection_status))
        .route("/search-products", get(search_products))
        .route("/search-collections", get(search_collections))
        .route("/products/{id}", get(product))
        .route("/collections/{id}", get(collection))
        .route("/blocks/preview", post(preview_block))
        // Admin
        .route("/clear-cache", post(clear_cache))
        .route("/cache-status", get(cache_status))
        .route("/oauth/initiate", post(initiate_oauth))
        .route("/oauth/disconnect", post(disconnect))
        .route("/oauth/refresh-api-version", post(refresh_api_version))
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Search response; failures still answer 200 with `error: true`.
#[derive(Debug, Serialize)]
pub struct SearchResponse<T> {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub results: T,
}

#[derive(Debug, Serialize)]
pub struct ProductResults {
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize)]
pub struct CollectionResults {
    pub collections: Vec<CollectionSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub cached_items: usize,
}

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    #[serde(default)]
    pub shop_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub redirect_url: String,
}

#[derive(Debug, Serialize)]
pub struct ApiVersionResponse {
    pub success: bool,
    pub api_version: String,
    pub detected: bool,
}

// =============================================================================
// Editor Endpoints
// =============================================================================

/// GET /api/connection-status
#[instrument(skip(state, _auth))]
async fn connection_status(
    State(state): State<AppState>,
    _auth: RequireEditor,
) -> Result<Json<ConnectionStatus>> {
    if state.settings().api_credentials().await?.is_none() {
        return Ok(Json(ConnectionStatus {
            connected: false,
            shop_name: None,
            message: Some("Shopify credentials not configured.".to_string()),
        }));
    }

    let status = match state.catalog().shop_name().await {
        Ok(name) => ConnectionStatus {
            connected: true,
            shop_name: Some(name),
            message: None,
        },
        Err(e) => {
            warn!(error = %e, "Connection check failed");
            ConnectionStatus {
                connected: false,
                shop_name: None,
                message: Some(e.to_string()),
            }
        }
    };
    Ok(Json(status))
}

/// GET /api/search-products?query=
#[instrument(skip(state, _auth))]
async fn search_products(
    State(state): State<AppState>,
    _auth: RequireEditor,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse<ProductResults>> {
    Json(match state.catalog().search_products(&params.query).await {
        Ok(products) => SearchResponse {
            error: false,
            message: None,
            results: ProductResults { products },
        },
        Err(e) => {
            warn!(error = %e, "Product search failed");
            SearchResponse {
                error: true,
                message: Some(e.to_string()),
                results: ProductResults {
                    products: Vec::new(),
                },
            }
        }
    })
}

/// GET /api/search-collections?query=
#[instrument(skip(state, _auth))]
async fn search_collections(
    State(state): State<AppState>,
    _auth: RequireEditor,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse<CollectionResults>> {
    Json(match state.catalog().search_collections(&params.query).await {
        Ok(collections) => SearchResponse {
            error: false,
            message: None,
            results: CollectionResults { collections },
        },
        Err(e) => {
            warn!(error = %e, "Collection search failed");
            SearchResponse {
                error: true,
                message: Some(e.to_string()),
                results: CollectionResults {
                    collections: Vec::new(),
                },
            }
        }
    })
}

/// GET /api/products/{id}
#[instrument(skip(state, _auth))]
async fn product(
    State(state): State<AppState>,
    _auth: RequireEditor,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>> {
    state
        .catalog()
        .fetch_product(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// GET /api/collections/{id}
#[instrument(skip(state, _auth))]
async fn collection(
    State(state): State<AppState>,
    _auth: RequireEditor,
    Path(id): Path<String>,
) -> Result<Json<CollectionInfo>> {
    state
        .catalog()
        .fetch_collection(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("collection {id}")))
}

/// POST /api/blocks/preview
#[instrument(skip_all)]
async fn preview_block(
    State(state): State<AppState>,
    _auth: RequireEditor,
    Json(attrs): Json<BlockAttributes>,
) -> Result<Html<String>> {
    let html = state.renderer().render(&attrs, RenderMode::Preview).await?;
    Ok(Html(html))
}

// =============================================================================
// Admin Endpoints
// =============================================================================

/// POST /api/clear-cache
#[instrument(skip(state))]
async fn clear_cache(State(state): State<AppState>, _auth: RequireAdmin) -> Json<MessageResponse> {
    let removed = state.cache().clear(SHOPIFY_PREFIX).await;
    info!(removed, "Cache cleared");
    Json(MessageResponse {
        success: true,
        message: "Cache cleared successfully.".to_string(),
    })
}

/// GET /api/cache-status
#[instrument(skip(state))]
async fn cache_status(State(state): State<AppState>, _auth: RequireAdmin) -> Json<CacheStatus> {
    Json(CacheStatus {
        cached_items: state.cache().count(SHOPIFY_PREFIX).await,
    })
}

/// POST /api/oauth/initiate
#[instrument(skip_all)]
async fn initiate_oauth(
    State(state): State<AppState>,
    _auth: RequireAdmin,
    Json(req): Json<InitiateRequest>,
) -> Result<Json<InitiateResponse>> {
    let redirect_url = state
        .oauth()
        .initiate(&req.shop_url, &req.client_id, &req.client_secret)
        .await?;
    Ok(Json(InitiateResponse { redirect_url }))
}

/// POST /api/oauth/disconnect
#[instrument(skip(state))]
async fn disconnect(State(state): State<AppState>, _auth: RequireAdmin) -> Result<Json<MessageResponse>> {
    state.oauth().disconnect().await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Disconnected from Shopify.".to_string(),
    }))
}

/// POST /api/oauth/refresh-api-version
#[instrument(skip(state))]
async fn refresh_api_version(
    State(state): State<AppState>,
    _auth: RequireAdmin,
) -> Result<Json<ApiVersionResponse>> {
    let detected = state.oauth().refresh_api_version().await?;
    let api_version = state.settings().api_version().await?;
    Ok(Json(ApiVersionResponse {
        success: detected.is_some(),
        api_version: api_version.to_string(),
        detected: detected.is_some(),
    }))
}
