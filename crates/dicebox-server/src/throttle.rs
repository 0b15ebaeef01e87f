use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// SupplyThrottle
// ---------------------------------------------------------------------------

/// Rate gate for player-triggered picks: at most one successful acquire
/// per cool-down window, however many requests arrive. No queueing;
/// rejected callers are not retried here.
///
/// The latch is an explicit compare-and-swap so the invariant holds under
/// a multi-threaded runtime; a successful acquire schedules its own
/// release on a spawned timer.
pub struct SupplyThrottle {
    held: AtomicBool,
    cooldown: Duration,
}

impl SupplyThrottle {
    pub fn new(cooldown: Duration) -> Arc<Self> {
        Arc::new(Self {
            held: AtomicBool::new(false),
            cooldown,
        })
    }

    /// `true` when the caller may proceed. The latch releases itself after
    /// the cool-down elapses.
    pub fn try_acquire(self: &Arc<Self>) -> bool {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let throttle = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(throttle.cooldown).await;
            throttle.held.store(false, Ordering::Release);
        });

        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
