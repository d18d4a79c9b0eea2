//! Cache configuration.

/// Behaviour switches of a [`NodeCache`](crate::NodeCache).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// `collect` calls have an effect.
    pub collects: bool,
    /// Collecting also marks the node and its ancestors dirty, and
    /// `should_update` answers from the dirty set.
    pub collects_updates: bool,
    /// `perf_log` emits size events.
    pub perf_log: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            collects: true,
            collects_updates: false,
            perf_log: false,
        }
    }
}

/// How far the clone hook descends when mirroring cache entries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MirrorWalkMode {
    /// Visit every pair of the cloned subtree.
    #[default]
    Full,
    /// Skip the children of a pair whose original node has no entry.
    ///
    /// Only sound when entries are always collected top-down, so that no
    /// cached node sits below an uncached ancestor inside one clone.
    Pruned,
}
