use axum::extract::State;
use axum::Json;

use dicebox_core::{IdeaGenerator, IdeaPool};

use crate::state::AppState;

/// GET /pick-idea — the player-facing pick.
///
/// Always 200: the body carries either the picked idea, the store or
/// generator error verbatim, or (when rate-limited) a throttle message
/// with neither field.
pub async fn pick_idea<P: IdeaPool, G: IdeaGenerator>(
    State(app): State<AppState<P, G>>,
) -> Json<serde_json::Value> {
    if !app.throttle.try_acquire() {
        return Json(serde_json::json!({ "message": "throttling timeout not over" }));
    }

    match app.pipeline.pick().await {
        Ok(picked) => Json(serde_json::json!({ "idea": picked.idea })),
        Err(error) => {
            tracing::warn!(%error, "pick failed");
            Json(serde_json::json!({ "error": error.to_string() }))
        }
    }
}
