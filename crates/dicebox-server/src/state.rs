use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use dice_link::LinkEvent;
use dicebox_core::config::SupplyConfig;
use dicebox_core::{DiceState, IdeaGenerator, IdeaPool, LabelCatalog};

use crate::pick::{PickPipeline, SharedLabels};
use crate::replenish::ReplenishSettings;
use crate::throttle::SupplyThrottle;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState<P, G> {
    pub dice: DiceState,
    pub labels: SharedLabels,
    pub throttle: Arc<SupplyThrottle>,
    pub pipeline: Arc<PickPipeline<P, G>>,
}

impl<P: IdeaPool, G: IdeaGenerator> AppState<P, G> {
    pub fn new(
        pool: P,
        generator: G,
        labels: LabelCatalog,
        dice: DiceState,
        supply: &SupplyConfig,
    ) -> Self {
        let labels: SharedLabels = Arc::new(RwLock::new(labels));
        let pipeline = Arc::new(PickPipeline::new(
            pool,
            generator,
            Arc::clone(&labels),
            dice.clone(),
            ReplenishSettings::from(supply),
        ));
        Self {
            dice,
            labels,
            throttle: SupplyThrottle::new(supply.throttle_cooldown()),
            pipeline,
        }
    }
}

// ---------------------------------------------------------------------------
// Link event folding
// ---------------------------------------------------------------------------

/// Fold supervisor link events into the shared dice state map.
/// Last-write-wins per die; a lagged receiver only loses intermediate
/// values, never the stream.
pub fn spawn_state_sync(
    dice: DiceState,
    mut rx: broadcast::Receiver<LinkEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(LinkEvent::Connected { die }) => {
                    tracing::info!(%die, "die connected");
                    dice.set_connected(die, true);
                }
                Ok(LinkEvent::Disconnected { die }) => {
                    tracing::info!(%die, "die disconnected");
                    dice.set_connected(die, false);
                }
                Ok(LinkEvent::SideChanged(reading)) => {
                    tracing::info!(die = %reading.die, side = %reading.side, "side changed");
                    dice.record_side(reading);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "state sync lagged behind link events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
