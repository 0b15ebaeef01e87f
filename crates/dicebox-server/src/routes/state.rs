use axum::extract::State;
use axum::Json;

use dicebox_core::{DieId, IdeaGenerator, IdeaPool};

use crate::state::AppState;

/// GET /state — connectivity and last side per die.
pub async fn get_state<P: IdeaPool, G: IdeaGenerator>(
    State(app): State<AppState<P, G>>,
) -> Json<serde_json::Value> {
    let mut dice = serde_json::Map::new();
    for die in DieId::ALL {
        let status = app.dice.status(die);
        dice.insert(
            die.to_string(),
            serde_json::json!({
                "connected": status.connected,
                "side": status.side.map(|s| s.value()),
                "tag": app.dice.side_tag(die),
            }),
        );
    }
    Json(serde_json::json!({ "dice": dice }))
}
