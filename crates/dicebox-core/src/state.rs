use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::types::{DieId, Side, SideReading};

// ---------------------------------------------------------------------------
// DiceState
// ---------------------------------------------------------------------------

/// Connectivity and last reported side per die.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DieStatus {
    pub connected: bool,
    pub side: Option<Side>,
}

/// The shared side/connectivity map. Updates are last-write-wins per die;
/// the supervisor's per-die event streams never race on the same key.
///
/// Cheap to clone; all clones observe the same map.
#[derive(Debug, Clone, Default)]
pub struct DiceState {
    inner: Arc<RwLock<BTreeMap<DieId, DieStatus>>>,
}

impl DiceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, die: DieId, connected: bool) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(die).or_default().connected = connected;
    }

    pub fn record_side(&self, reading: SideReading) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(reading.die).or_default().side = Some(reading.side);
    }

    pub fn status(&self, die: DieId) -> DieStatus {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&die).copied().unwrap_or_default()
    }

    pub fn side(&self, die: DieId) -> Option<Side> {
        self.status(die).side
    }

    /// The legacy string tag for a die's current side, e.g. `"A3"`.
    pub fn side_tag(&self, die: DieId) -> Option<String> {
        self.side(die).map(|side| SideReading { die, side }.tag())
    }

    pub fn snapshot(&self) -> BTreeMap<DieId, DieStatus> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
