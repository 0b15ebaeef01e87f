use std::sync::PoisonError;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use dicebox_core::{IdeaGenerator, IdeaPool, LabelCatalog};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LabelsPayload {
    pub labels: LabelCatalog,
}

/// GET /labels — the current label catalog.
pub async fn get_labels<P: IdeaPool, G: IdeaGenerator>(
    State(app): State<AppState<P, G>>,
) -> Json<serde_json::Value> {
    let labels = app
        .labels
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Json(serde_json::json!({ "labels": labels }))
}

/// PUT /labels — replace the label catalog. A label change shifts the
/// live parameter space, so the pool is warmed for the new combination.
pub async fn put_labels<P: IdeaPool, G: IdeaGenerator>(
    State(app): State<AppState<P, G>>,
    Json(payload): Json<LabelsPayload>,
) -> Json<serde_json::Value> {
    {
        let mut labels = app.labels.write().unwrap_or_else(PoisonError::into_inner);
        *labels = payload.labels;
    }

    let replenish_started = app.pipeline.kick_replenish();
    tracing::info!(replenish_started, "labels updated");

    Json(serde_json::json!({ "message": "success" }))
}
