use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use dicebox_core::config::SupplyConfig;
use dicebox_core::{IdeaGenerator, IdeaPool, ParameterQuery, Strategy};

use crate::pick::sample_choice;

// ---------------------------------------------------------------------------
// ReplenishGuard / ReplenishPermit
// ---------------------------------------------------------------------------

/// Process-wide "one replenishment at a time" permit. The scope is
/// deliberately global across parameter combinations, matching the
/// installation's observed behavior.
#[derive(Debug, Default)]
pub struct ReplenishGuard {
    running: AtomicBool,
}

impl ReplenishGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the permit, or `None` when a run is already in flight.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ReplenishPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| ReplenishPermit {
                guard: Arc::clone(self),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Held for the lifetime of one replenishment run; released on drop, so
/// the permit cannot leak across panics or early returns.
pub struct ReplenishPermit {
    guard: Arc<ReplenishGuard>,
}

impl Drop for ReplenishPermit {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Replenishment loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReplenishSettings {
    /// Stop once the pool holds this many rows for the combination.
    pub min_pregenerated: u64,
    /// Iteration cap: a run never loops forever under persistent failure.
    pub max_attempts: u32,
    /// Pause after a failed generation or insert.
    pub retry_backoff: Duration,
}

impl From<&SupplyConfig> for ReplenishSettings {
    fn from(supply: &SupplyConfig) -> Self {
        Self {
            min_pregenerated: supply.min_pregenerated,
            max_attempts: supply.max_replenish_attempts,
            retry_backoff: supply.retry_backoff(),
        }
    }
}

/// Start a background top-up for `query`. Fire-and-forget from the
/// caller's perspective: failures are logged and dropped, never surfaced
/// into the pick path. Returns `None` when a run is already in flight.
pub fn spawn_replenish<P: IdeaPool, G: IdeaGenerator>(
    pool: P,
    generator: G,
    query: ParameterQuery,
    guard: &Arc<ReplenishGuard>,
    settings: ReplenishSettings,
) -> Option<JoinHandle<()>> {
    let permit = guard.try_acquire()?;
    Some(tokio::spawn(run_replenish(
        pool, generator, query, settings, permit,
    )))
}

/// Generate-and-insert until the pool holds `min_pregenerated` matching
/// rows, bounded by `max_attempts`.
async fn run_replenish<P: IdeaPool, G: IdeaGenerator>(
    pool: P,
    generator: G,
    query: ParameterQuery,
    settings: ReplenishSettings,
    _permit: ReplenishPermit,
) {
    let mut attempts = 0u32;
    loop {
        match pool.count_matching(&query).await {
            Ok(count) if count >= settings.min_pregenerated => {
                tracing::debug!(count, "pool is topped up");
                return;
            }
            Ok(count) => {
                tracing::debug!(count, target = settings.min_pregenerated, "replenishing pool");
            }
            Err(error) => {
                tracing::warn!(%error, "pool count failed, aborting replenishment");
                return;
            }
        }

        if attempts >= settings.max_attempts {
            tracing::warn!(
                attempts,
                "replenishment gave up before reaching the threshold"
            );
            return;
        }
        attempts += 1;

        let choice = match sample_choice(&query) {
            Ok(choice) => choice,
            Err(error) => {
                tracing::warn!(%error, "cannot sample a parameter choice, aborting replenishment");
                return;
            }
        };

        match generator.generate(&choice, Strategy::Pregenerate).await {
            Ok(idea) => {
                if let Err(error) = pool.insert(&idea).await {
                    tracing::warn!(%error, "failed to insert pregenerated idea");
                    tokio::time::sleep(settings.retry_backoff).await;
                }
            }
            Err(error) => {
                tracing::warn!(%error, attempts, "generation failed");
                tokio::time::sleep(settings.retry_backoff).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use chrono::Utc;
    use dicebox_core::{GenerateError, IdeaRecord, MemoryPool, ParameterChoice};

    #[derive(Clone, Default)]
    struct StubGenerator {
        calls: Arc<AtomicUsize>,
        failing: bool,
    }

    impl StubGenerator {
        fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IdeaGenerator for StubGenerator {
        async fn generate(
            &self,
            choice: &ParameterChoice,
            _strategy: Strategy,
        ) -> Result<IdeaRecord, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(GenerateError::Status(503));
            }
            Ok(IdeaRecord {
                idea: format!("idea for {}", choice.topic),
                focus_group: choice.focus_group.clone(),
                topic: choice.topic.clone(),
                medium: choice.medium.clone(),
                illustration_url: None,
                postcard_url: None,
            })
        }
    }

    fn query() -> ParameterQuery {
        ParameterQuery {
            focus_groups: vec!["children".into()],
            topics: vec!["water".into()],
            mediums: vec!["sculpture".into()],
        }
    }

    fn record() -> IdeaRecord {
        IdeaRecord {
            idea: "seeded".into(),
            focus_group: "children".into(),
            topic: "water".into(),
            medium: "sculpture".into(),
            illustration_url: None,
            postcard_url: None,
        }
    }

    fn settings(min: u64) -> ReplenishSettings {
        ReplenishSettings {
            min_pregenerated: min,
            max_attempts: 25,
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn tops_up_to_the_threshold_and_stops() {
        let pool = MemoryPool::new();
        for _ in 0..3 {
            pool.seed(record(), Utc::now());
        }
        let generator = StubGenerator::default();
        let guard = ReplenishGuard::new();

        let handle =
            spawn_replenish(pool.clone(), generator.clone(), query(), &guard, settings(5)).unwrap();
        handle.await.unwrap();

        assert_eq!(generator.calls(), 2);
        assert_eq!(pool.rows().len(), 5);
    }

    #[tokio::test]
    async fn full_pool_generates_nothing() {
        let pool = MemoryPool::new();
        for _ in 0..5 {
            pool.seed(record(), Utc::now());
        }
        let generator = StubGenerator::default();
        let guard = ReplenishGuard::new();

        let handle =
            spawn_replenish(pool.clone(), generator.clone(), query(), &guard, settings(5)).unwrap();
        handle.await.unwrap();

        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn second_invocation_while_running_is_a_noop() {
        let guard = ReplenishGuard::new();
        let _permit = guard.try_acquire().unwrap();

        let pool = MemoryPool::new();
        let generator = StubGenerator::default();
        assert!(spawn_replenish(pool, generator.clone(), query(), &guard, settings(5)).is_none());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn permit_is_released_when_the_run_finishes() {
        let pool = MemoryPool::new();
        pool.seed(record(), Utc::now());
        let guard = ReplenishGuard::new();

        let handle = spawn_replenish(
            pool.clone(),
            StubGenerator::default(),
            query(),
            &guard,
            settings(1),
        )
        .unwrap();
        handle.await.unwrap();

        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn persistent_generation_failure_stops_at_the_attempt_cap() {
        let pool = MemoryPool::new();
        let generator = StubGenerator::failing();
        let guard = ReplenishGuard::new();

        let mut capped = settings(5);
        capped.max_attempts = 3;

        let handle =
            spawn_replenish(pool.clone(), generator.clone(), query(), &guard, capped).unwrap();
        handle.await.unwrap();

        assert_eq!(generator.calls(), 3);
        assert!(pool.rows().is_empty());
        assert!(!guard.is_running());
    }

    #[tokio::test]
    async fn count_failure_aborts_the_run() {
        let pool = MemoryPool::new();
        pool.fail_with("store unavailable");
        let generator = StubGenerator::default();
        let guard = ReplenishGuard::new();

        let handle =
            spawn_replenish(pool.clone(), generator.clone(), query(), &guard, settings(5)).unwrap();
        handle.await.unwrap();

        assert_eq!(generator.calls(), 0);
        assert!(!guard.is_running());
    }
}
