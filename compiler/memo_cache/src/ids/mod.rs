//! Positional identities for memo scopes and call sites.
//!
//! A positional identity is a small integer that names one call site or
//! function scope inside a source unit. Memoized runtime state is keyed by
//! these integers, so the same key must keep its integer across incremental
//! re-runs of the pass over the same unit.
//!
//! # Design
//!
//! - Keys map to integers in first-seen order, starting at 0.
//! - A missing key always allocates a fresh integer that is never reused.
//! - [`for_unit`] hands out one shared tracker per unit name for the whole
//!   process, so separate passes agree on the numbering.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Stable integer identities for one source unit.
#[derive(Clone, Debug)]
pub struct PositionalIdTracker {
    unit: String,
    next: u32,
    assigned: FxHashMap<String, u32>,
}

impl PositionalIdTracker {
    pub fn new(unit: impl Into<String>) -> Self {
        PositionalIdTracker {
            unit: unit.into(),
            next: 0,
            assigned: FxHashMap::default(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Identity for `key`, allocating one on first sight.
    ///
    /// Without a key the result is fresh on every call.
    pub fn id(&mut self, key: Option<&str>) -> u32 {
        let Some(key) = key else {
            return self.fresh();
        };
        if let Some(&id) = self.assigned.get(key) {
            return id;
        }
        let id = self.fresh();
        self.assigned.insert(key.to_owned(), id);
        tracing::trace!(unit = %self.unit, key, id, "assigned positional id");
        id
    }

    /// Number of identities handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }

    fn fresh(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

type TrackerMap = Mutex<FxHashMap<String, Arc<Mutex<PositionalIdTracker>>>>;

// Process-wide trackers, one per source unit
static TRACKERS: OnceLock<TrackerMap> = OnceLock::new();

/// The shared tracker for `unit`, created on first request.
///
/// Every call with the same unit name returns the same tracker.
pub fn for_unit(unit: &str) -> Arc<Mutex<PositionalIdTracker>> {
    let mut trackers = TRACKERS
        .get_or_init(|| Mutex::new(FxHashMap::default()))
        .lock();
    Arc::clone(
        trackers
            .entry(unit.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(PositionalIdTracker::new(unit)))),
    )
}
