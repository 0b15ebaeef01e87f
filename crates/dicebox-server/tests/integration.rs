use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

use dicebox_core::config::SupplyConfig;
use dicebox_core::{
    DiceState, DieId, GenerateError, IdeaGenerator, IdeaRecord, LabelCatalog, MemoryPool,
    ParameterChoice, Side, SideReading, Strategy,
};
use dicebox_server::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generator stub: fabricates an idea from the choice, optionally slowly.
#[derive(Clone, Default)]
struct StubGenerator {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl StubGenerator {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

impl IdeaGenerator for StubGenerator {
    async fn generate(
        &self,
        choice: &ParameterChoice,
        _strategy: Strategy,
    ) -> Result<IdeaRecord, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(IdeaRecord {
            idea: format!("fresh idea about {}", choice.topic),
            focus_group: choice.focus_group.clone(),
            topic: choice.topic.clone(),
            medium: choice.medium.clone(),
            illustration_url: None,
            postcard_url: None,
        })
    }
}

fn catalog() -> LabelCatalog {
    LabelCatalog {
        focus_group: (1..=6).map(|n| format!("group-{n}")).collect(),
        topic: (1..=6).map(|n| format!("topic-{n}")).collect(),
        medium: (1..=6).map(|n| format!("medium-{n}")).collect(),
    }
}

/// Supply settings that keep the post-pick replenishment inert, so
/// request assertions only see the pick's own effects.
fn inert_supply() -> SupplyConfig {
    SupplyConfig {
        min_pregenerated: 0,
        max_replenish_attempts: 0,
        ..SupplyConfig::default()
    }
}

struct TestApp {
    router: axum::Router,
    pool: MemoryPool,
    dice: DiceState,
}

fn test_app(generator: StubGenerator, supply: SupplyConfig) -> TestApp {
    let pool = MemoryPool::new();
    let dice = DiceState::new();
    let state = AppState::new(pool.clone(), generator, catalog(), dice.clone(), &supply);
    TestApp {
        router: dicebox_server::build_router(state),
        pool,
        dice,
    }
}

fn roll_all_ones(dice: &DiceState) {
    for die in DieId::ALL {
        dice.record_side(SideReading {
            die,
            side: Side::new(1).unwrap(),
        });
    }
}

fn matching_record(tag: &str) -> IdeaRecord {
    IdeaRecord {
        idea: format!("idea {tag}"),
        focus_group: "group-1".into(),
        topic: "topic-1".into(),
        medium: "medium-1".into(),
        illustration_url: None,
        postcard_url: None,
    }
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn send_json(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Liveness / fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_reports_ok() {
    let app = test_app(StubGenerator::default(), inert_supply());
    let (status, body) = get(app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "message": "ok" }));
}

#[tokio::test]
async fn unknown_paths_fall_back_to_liveness() {
    let app = test_app(StubGenerator::default(), inert_supply());
    let (status, body) = get(app.router, "/nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ok");
}

// ---------------------------------------------------------------------------
// /state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn state_lists_all_three_dice() {
    let app = test_app(StubGenerator::default(), inert_supply());
    let (status, body) = get(app.router, "/state").await;
    assert_eq!(status, StatusCode::OK);
    for die in ["A", "B", "C"] {
        assert_eq!(body["dice"][die]["connected"], false);
        assert!(body["dice"][die]["side"].is_null());
    }
}

#[tokio::test]
async fn state_reflects_side_and_connectivity() {
    let app = test_app(StubGenerator::default(), inert_supply());
    app.dice.set_connected(DieId::A, true);
    app.dice.record_side(SideReading {
        die: DieId::A,
        side: Side::new(3).unwrap(),
    });

    let (_, body) = get(app.router, "/state").await;
    assert_eq!(body["dice"]["A"]["connected"], true);
    assert_eq!(body["dice"]["A"]["side"], 3);
    assert_eq!(body["dice"]["A"]["tag"], "A3");
}

#[tokio::test]
async fn link_events_flow_through_to_the_state_endpoint() {
    let app = test_app(StubGenerator::default(), inert_supply());

    let (tx, rx) = tokio::sync::broadcast::channel(16);
    let _sync = dicebox_server::spawn_state_sync(app.dice.clone(), rx);

    tx.send(dice_link::LinkEvent::SideChanged(SideReading {
        die: DieId::A,
        side: Side::new(3).unwrap(),
    }))
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (_, body) = get(app.router, "/state").await;
    assert_eq!(body["dice"]["A"]["tag"], "A3");
}

// ---------------------------------------------------------------------------
// /labels
// ---------------------------------------------------------------------------

#[tokio::test]
async fn labels_roundtrip_through_get_and_put() {
    let app = test_app(StubGenerator::default(), inert_supply());

    let (status, body) = get(app.router.clone(), "/labels").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["labels"]["focus_group"][0], "group-1");

    let mut new_labels = catalog();
    new_labels.focus_group[0] = "some other label".into();
    let (status, body) = send_json(
        app.router.clone(),
        "PUT",
        "/labels",
        serde_json::json!({ "labels": new_labels }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "message": "success" }));

    let (_, body) = get(app.router, "/labels").await;
    assert_eq!(body["labels"]["focus_group"][0], "some other label");
}

#[tokio::test]
async fn labels_reject_unsupported_methods() {
    let app = test_app(StubGenerator::default(), inert_supply());
    let (status, _) = send_json(app.router, "POST", "/labels", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// /pick-idea
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pick_idea_consumes_the_pool_row() {
    let app = test_app(StubGenerator::default(), inert_supply());
    roll_all_ones(&app.dice);
    app.pool.seed(matching_record("pooled"), Utc::now());

    let (status, body) = get(app.router, "/pick-idea").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idea"]["idea"], "idea pooled");
    assert!(body.get("error").is_none());

    assert!(app.pool.rows().is_empty());
    assert_eq!(app.pool.history().len(), 1);
}

#[tokio::test]
async fn pick_idea_generates_realtime_when_pool_is_dry() {
    let app = test_app(StubGenerator::default(), inert_supply());
    roll_all_ones(&app.dice);

    let (status, body) = get(app.router, "/pick-idea").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idea"]["idea"], "fresh idea about topic-1");

    // realtime path touches neither the pool nor the history
    assert!(app.pool.rows().is_empty());
    assert!(app.pool.history().is_empty());
}

#[tokio::test]
async fn pick_idea_is_throttled_within_the_cooldown() {
    let app = test_app(StubGenerator::default(), inert_supply());
    roll_all_ones(&app.dice);

    let (_, first) = get(app.router.clone(), "/pick-idea").await;
    assert!(first.get("idea").is_some());

    let (status, second) = get(app.router, "/pick-idea").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["message"], "throttling timeout not over");
    assert!(second.get("idea").is_none());
    assert!(second.get("error").is_none());
}

#[tokio::test]
async fn pick_idea_surfaces_store_errors_verbatim() {
    let app = test_app(StubGenerator::default(), inert_supply());
    roll_all_ones(&app.dice);
    app.pool.fail_with("relation does not exist");

    let (status, body) = get(app.router, "/pick-idea").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "relation does not exist");
    assert!(body.get("idea").is_none());
}

// ---------------------------------------------------------------------------
// /pregenerate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pregenerate_starts_one_run_at_a_time() {
    let supply = SupplyConfig {
        min_pregenerated: 1,
        ..SupplyConfig::default()
    };
    let app = test_app(StubGenerator::slow(Duration::from_millis(300)), supply);
    roll_all_ones(&app.dice);

    let (status, body) = get(app.router.clone(), "/pregenerate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pregeneration started");

    // the slow generator keeps the first run in flight
    let (_, body) = get(app.router, "/pregenerate").await;
    assert_eq!(body["message"], "pregeneration already running");
}

#[tokio::test]
async fn pregenerate_tops_up_the_pool() {
    let supply = SupplyConfig {
        min_pregenerated: 2,
        ..SupplyConfig::default()
    };
    let app = test_app(StubGenerator::default(), supply);
    roll_all_ones(&app.dice);

    let (_, body) = get(app.router, "/pregenerate").await;
    assert_eq!(body["message"], "pregeneration started");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.pool.rows().len(), 2);
}
