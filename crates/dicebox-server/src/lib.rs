pub mod generate;
pub mod pick;
pub mod replenish;
pub mod routes;
pub mod state;
pub mod store;
pub mod throttle;

use std::future::IntoFuture;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use dice_link::{DeviceSupervisor, RfcommTransport, SupervisorOptions};
use dicebox_core::config::Config;
use dicebox_core::{DiceState, IdeaGenerator, IdeaPool};

pub use generate::HttpGenerator;
pub use pick::{PickError, PickPipeline, PickSource, PickedIdea};
pub use replenish::{spawn_replenish, ReplenishGuard, ReplenishSettings};
pub use state::{spawn_state_sync, AppState};
pub use store::PgIdeaPool;
pub use throttle::SupplyThrottle;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router<P: IdeaPool, G: IdeaGenerator>(state: AppState<P, G>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::health::is_alive))
        .route("/state", get(routes::state::get_state::<P, G>))
        .route(
            "/labels",
            get(routes::labels::get_labels::<P, G>).put(routes::labels::put_labels::<P, G>),
        )
        .route("/pick-idea", get(routes::pick_idea::pick_idea::<P, G>))
        .route("/pregenerate", get(routes::pregenerate::pregenerate::<P, G>))
        .fallback(routes::health::is_alive)
        .layer(cors)
        .with_state(state)
}

/// Start the installation daemon: the device supervisor plus the REST API.
///
/// Ctrl-C stops the server and terminates every managed serial reader
/// process; binding release on shutdown is best-effort.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = PgIdeaPool::connect(&config.store.resolved_url()).await?;
    let generator = HttpGenerator::new(config.generator.url.clone(), config.generator.timeout())?;
    let dice_state = DiceState::new();

    let transport = RfcommTransport::new(config.serial.clone());
    let supervisor = DeviceSupervisor::start(
        config.dice.clone(),
        transport,
        SupervisorOptions {
            connect_grace: config.supervisor.connect_grace(),
            restart_delay: config.supervisor.restart_delay(),
        },
    );
    let sync = spawn_state_sync(dice_state.clone(), supervisor.subscribe());

    let app_state = AppState::new(
        pool,
        generator,
        config.labels.clone(),
        dice_state,
        &config.supply,
    );
    let router = build_router(app_state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("dicebox api listening on http://localhost:{}", config.server.port);

    let server = axum::serve(listener, router).into_future();
    let result = tokio::select! {
        res = server => res.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => Ok(()),
    };

    supervisor.shutdown().await;
    sync.abort();
    result
}
