//! Shopify OAuth redirect target.

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use tracing::{error, info, instrument};

use crate::shopify::{CallbackParams, Flash, ShopifyError};
use crate::state::AppState;

/// Build the OAuth callback router.
pub fn router() -> Router<AppState> {
    Router::new().route("/oauth/callback", get(callback))
}

/// Complete the OAuth flow and return to the settings page with a notice.
///
/// GET /oauth/callback
///
/// Unauthenticated: the one-time `state` is the guard.
#[instrument(skip_all)]
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Redirect {
    let flash = match state.oauth().handle_callback(&CallbackParams::new(params)).await {
        Ok(()) => {
            info!("Shopify connected");
            Flash::success("Successfully connected to Shopify!")
        }
        Err(ShopifyError::Settings(e)) => {
            error!(error = %e, "Failed to store Shopify credentials");
            Flash::error("Could not save the Shopify connection. Please try again.")
        }
        Err(e) => Flash::error(e.to_string()),
    };

    state.oauth().set_flash(&flash).await;
    Redirect::to("/admin/settings")
}
