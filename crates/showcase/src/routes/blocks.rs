//! Public block rendering.

use axum::{Json, Router, extract::State, response::Html, routing::post};
use tracing::instrument;

use crate::error::Result;
use crate::render::{BlockAttributes, RenderMode};
use crate::state::AppState;

/// Build the block rendering router.
pub fn router() -> Router<AppState> {
    Router::new().route("/blocks/render", post(render_block))
}

/// Render a block for a public page. An empty body means nothing to show.
///
/// POST /blocks/render
#[instrument(skip_all)]
async fn render_block(
    State(state): State<AppState>,
    Json(attrs): Json<BlockAttributes>,
) -> Result<Html<String>> {
    let html = state.renderer().render(&attrs, RenderMode::Frontend).await?;
    Ok(Html(html))
}
