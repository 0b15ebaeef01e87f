use axum::extract::State;
use axum::Json;

use dicebox_core::{IdeaGenerator, IdeaPool};

use crate::state::AppState;

/// GET /pregenerate — kick a pool top-up for the current dice sides.
pub async fn pregenerate<P: IdeaPool, G: IdeaGenerator>(
    State(app): State<AppState<P, G>>,
) -> Json<serde_json::Value> {
    if app.pipeline.kick_replenish() {
        Json(serde_json::json!({ "message": "pregeneration started" }))
    } else {
        Json(serde_json::json!({ "message": "pregeneration already running" }))
    }
}
