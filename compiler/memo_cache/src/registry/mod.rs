//! Named caches and the structural hooks that keep them consistent.
//!
//! A `CacheRegistry` is the context object passes thread through a session.
//! It creates caches on first access and is the `MutationObserver` a host
//! notifies on clone and update:
//! - **clone**: the active cache (if any) is mirrored onto the clone.
//! - **update**: every cache refreshes the `(original, updated)` pair.
//!
//! Passes never propagate cache state by hand; they edit the tree through
//! the host with the registry as observer.

use memo_ir::{MutationObserver, NodeId, TreeHost};
use rustc_hash::FxHashMap;

use crate::mirror::copy_cache_to_cloned_node;
use crate::{CacheError, MirrorWalkMode, NodeCache, NodeMetadata};

/// All named caches of one transformation session.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    caches: FxHashMap<String, NodeCache>,
    active: Option<String>,
    mirror_mode: MirrorWalkMode,
    perf_log: bool,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache named `name`, created with default configuration if missing.
    pub fn get_cache(&mut self, name: &str) -> &mut NodeCache {
        self.caches
            .entry(name.to_owned())
            .or_insert_with(|| NodeCache::new(name))
    }

    /// The cache named `name`, without creating it.
    pub fn cache(&self, name: &str) -> Option<&NodeCache> {
        self.caches.get(name)
    }

    /// Number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    // ── Hook configuration ──────────────────────────────────────────

    /// Select the cache the clone hook keeps in sync. `None` disables mirroring.
    pub fn set_active(&mut self, name: Option<&str>) {
        self.active = name.map(str::to_owned);
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn set_mirror_mode(&mut self, mode: MirrorWalkMode) {
        self.mirror_mode = mode;
    }

    pub fn mirror_mode(&self) -> MirrorWalkMode {
        self.mirror_mode
    }

    pub fn should_perf_log(&mut self, perf_log: bool) -> &mut Self {
        self.perf_log = perf_log;
        self
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Whether `name` (or, without a name, any cache) holds `id`.
    pub fn has(&self, id: NodeId, name: Option<&str>) -> bool {
        match name {
            Some(name) => self.caches.get(name).is_some_and(|cache| cache.has(id)),
            None => self.caches.values().any(|cache| cache.has(id)),
        }
    }

    /// Whether `name` (or, without a name, any cache) wants `id` re-emitted.
    ///
    /// An unknown cache name answers `false`.
    pub fn should_update(&self, id: NodeId, name: Option<&str>) -> bool {
        match name {
            Some(name) => self
                .caches
                .get(name)
                .is_some_and(|cache| cache.should_update(id)),
            None => self.caches.values().any(|cache| cache.should_update(id)),
        }
    }

    /// Metadata the active cache holds for `id`.
    pub fn active_metadata(&self, id: NodeId) -> Option<&NodeMetadata> {
        self.caches.get(self.active.as_deref()?)?.metadata(id)
    }

    // ── Propagation ─────────────────────────────────────────────────

    /// Refresh `original -> node` in every targeted cache that holds `original`.
    pub fn refresh(
        &mut self,
        host: &dyn TreeHost,
        original: NodeId,
        node: NodeId,
        name: Option<&str>,
    ) {
        for cache in self.targets(name) {
            if cache.has(original) {
                cache.refresh(host, original, node);
            }
        }
    }

    /// Transfer dirtiness `original -> node` in every targeted cache that
    /// wants `original` updated.
    pub fn refresh_update(
        &mut self,
        host: &dyn TreeHost,
        original: NodeId,
        node: NodeId,
        name: Option<&str>,
    ) {
        for cache in self.targets(name) {
            if cache.should_update(original) {
                cache.refresh_update(host, original, node);
            }
        }
    }

    /// Mirror the active cache from `original` onto its clone.
    ///
    /// Does nothing when no cache is active.
    pub fn copy_cache_to_cloned_node(
        &mut self,
        host: &dyn TreeHost,
        original: NodeId,
        cloned: NodeId,
        refresh: bool,
    ) -> Result<(), CacheError> {
        let Some(active) = self.active.as_deref() else {
            return Ok(());
        };
        let mode = self.mirror_mode;
        let Some(cache) = self.caches.get_mut(active) else {
            return Ok(());
        };
        copy_cache_to_cloned_node(cache, host, original, cloned, refresh, mode)
    }

    /// Clear every cache, then drop them all.
    pub fn clear(&mut self) {
        for cache in self.caches.values_mut() {
            cache.clear();
        }
        self.caches = FxHashMap::default();
    }

    /// Emit size events for `name` when requested and enabled on the registry.
    pub fn perf_log(&mut self, name: &str, should_log: bool) {
        if !should_log {
            return;
        }
        let perf_log = self.perf_log;
        if let Some(cache) = self.caches.get_mut(name) {
            cache.should_perf_log(perf_log).perf_log(Some(name));
        }
    }

    fn targets<'a>(
        &'a mut self,
        name: Option<&'a str>,
    ) -> impl Iterator<Item = &'a mut NodeCache> + 'a {
        self.caches
            .iter_mut()
            .filter(move |(key, _)| match name {
                Some(name) => name == key.as_str(),
                None => true,
            })
            .map(|(_, cache)| cache)
    }
}

impl MutationObserver for CacheRegistry {
    type Error = CacheError;

    fn on_clone(
        &mut self,
        host: &dyn TreeHost,
        original: NodeId,
        cloned: NodeId,
    ) -> Result<(), CacheError> {
        self.copy_cache_to_cloned_node(host, original, cloned, false)
    }

    fn on_update(
        &mut self,
        host: &dyn TreeHost,
        original: NodeId,
        updated: NodeId,
    ) -> Result<(), CacheError> {
        self.refresh(host, original, updated, None);
        self.refresh_update(host, original, updated, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
