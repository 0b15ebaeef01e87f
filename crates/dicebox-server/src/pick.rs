use std::sync::{Arc, PoisonError, RwLock};

use rand::seq::SliceRandom;
use serde::Serialize;
use thiserror::Error;

use dicebox_core::{
    Axis, DiceState, DieId, GenerateError, IdeaGenerator, IdeaPool, IdeaRecord, LabelCatalog,
    ParameterChoice, ParameterQuery, PoolError, Strategy,
};

use crate::replenish::{spawn_replenish, ReplenishGuard, ReplenishSettings};

/// Label catalog shared between the pipeline and the labels endpoint.
pub type SharedLabels = Arc<RwLock<LabelCatalog>>;

// ---------------------------------------------------------------------------
// PickedIdea / PickError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickSource {
    /// Taken from the pregenerated pool (fast path).
    Pool,
    /// Generated on demand because the pool was dry (player-visible latency).
    Realtime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PickedIdea {
    pub idea: IdeaRecord,
    pub source: PickSource,
}

/// Pick failures carry the store/generator message verbatim so the REST
/// layer can surface them unwrapped.
#[derive(Debug, Error)]
pub enum PickError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("no labels configured for axis {0}")]
    NoLabels(Axis),
}

// ---------------------------------------------------------------------------
// PickPipeline
// ---------------------------------------------------------------------------

/// Orchestrates a player pick: resolve the current parameter combination,
/// consume the oldest matching pool row (moving it to history), fall back
/// to on-demand generation when the pool is dry, and kick a background
/// top-up on the way out.
pub struct PickPipeline<P, G> {
    pool: P,
    generator: G,
    labels: SharedLabels,
    dice: DiceState,
    guard: Arc<ReplenishGuard>,
    settings: ReplenishSettings,
}

impl<P: IdeaPool, G: IdeaGenerator> PickPipeline<P, G> {
    pub fn new(
        pool: P,
        generator: G,
        labels: SharedLabels,
        dice: DiceState,
        settings: ReplenishSettings,
    ) -> Self {
        Self {
            pool,
            generator,
            labels,
            dice,
            guard: ReplenishGuard::new(),
            settings,
        }
    }

    /// The parameter query for the dice as they lie right now. Never
    /// blocks on an unrolled die: an unresolved axis degrades to its
    /// whole vocabulary, logged.
    pub fn current_query(&self) -> ParameterQuery {
        let labels = self.labels.read().unwrap_or_else(PoisonError::into_inner);
        let candidates = |die: DieId| {
            let side = self.dice.side(die);
            if side.is_none() {
                tracing::warn!(
                    %die,
                    axis = %die.axis(),
                    "die has no recorded side, using the whole axis vocabulary"
                );
            }
            labels.candidates(die, side)
        };
        ParameterQuery {
            focus_groups: candidates(DieId::A),
            topics: candidates(DieId::B),
            mediums: candidates(DieId::C),
        }
    }

    pub async fn pick(&self) -> Result<PickedIdea, PickError> {
        let query = self.current_query();

        let Some(row) = self.pool.oldest_matching(&query).await? else {
            // pool is dry: the player waits for a fresh generation
            let choice = sample_choice(&query)?;
            tracing::info!(?choice, "pool empty, generating on demand");
            let idea = self.generator.generate(&choice, Strategy::Realtime).await?;
            return Ok(PickedIdea {
                idea,
                source: PickSource::Realtime,
            });
        };

        // Move pool → history. Two store operations: a crash in between
        // loses or duplicates one idea; transactional safety is the
        // store's concern, not ours.
        let record = row.record();
        self.pool.remove(row.id).await?;
        self.pool.archive(&record).await?;

        // the caller gets the idea without waiting for the top-up
        self.kick_replenish();

        Ok(PickedIdea {
            idea: record,
            source: PickSource::Pool,
        })
    }

    /// Start a background replenishment for the current combination.
    /// Returns `false` when a run is already in flight.
    pub fn kick_replenish(&self) -> bool {
        let query = self.current_query();
        spawn_replenish(
            self.pool.clone(),
            self.generator.clone(),
            query,
            &self.guard,
            self.settings.clone(),
        )
        .is_some()
    }
}

/// One concrete label per axis, drawn uniformly from the query's
/// candidate sets.
pub(crate) fn sample_choice(query: &ParameterQuery) -> Result<ParameterChoice, PickError> {
    let mut rng = rand::thread_rng();
    let mut pick = |candidates: &[String], axis: Axis| {
        candidates
            .choose(&mut rng)
            .cloned()
            .ok_or(PickError::NoLabels(axis))
    };
    Ok(ParameterChoice {
        focus_group: pick(&query.focus_groups, Axis::FocusGroup)?,
        topic: pick(&query.topics, Axis::Topic)?,
        medium: pick(&query.mediums, Axis::Medium)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
