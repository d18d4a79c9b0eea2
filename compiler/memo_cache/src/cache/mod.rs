//! A single named annotation cache.
//!
//! Entries map a `NodeId` to the node's kind at collection time and optional
//! metadata. The dirty set records nodes that must be re-emitted; it is kept
//! closed over ancestors by [`NodeCache::mark_dirty`].
//!
//! All operations that need structure (kind or parent) take the host as a
//! `&dyn TreeHost`; the cache never owns the tree.

use memo_ir::{NodeId, NodeKind, TreeHost};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{CacheConfig, NodeMetadata};

/// One cached node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: NodeId,
    /// Kind of the node when it was last collected.
    pub kind: NodeKind,
    /// `None` when nothing beyond presence was recorded.
    pub metadata: Option<NodeMetadata>,
}

/// Entries plus dirty set for one logical pass.
#[derive(Clone, Debug)]
pub struct NodeCache {
    name: String,
    config: CacheConfig,
    has_ever_collected: bool,
    entries: FxHashMap<NodeId, CacheEntry>,
    dirty: FxHashSet<NodeId>,
}

impl NodeCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CacheConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: CacheConfig) -> Self {
        NodeCache {
            name: name.into(),
            config,
            has_ever_collected: false,
            entries: FxHashMap::default(),
            dirty: FxHashSet::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    // ── Configuration ───────────────────────────────────────────────

    pub fn configure(&mut self, config: CacheConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn should_collect(&mut self, collects: bool) -> &mut Self {
        self.config.collects = collects;
        self
    }

    pub fn should_collect_update(&mut self, collects_updates: bool) -> &mut Self {
        self.config.collects_updates = collects_updates;
        self
    }

    pub fn should_perf_log(&mut self, perf_log: bool) -> &mut Self {
        self.config.perf_log = perf_log;
        self
    }

    /// Whether anything has ever been collected. Sticky: `clear` keeps it.
    pub fn is_collected(&self) -> bool {
        self.has_ever_collected
    }

    // ── Collection ──────────────────────────────────────────────────

    /// Record `id`, merging `metadata` into any existing entry.
    ///
    /// Does nothing when collection is disabled. With update tracking on,
    /// `id` and its ancestors are marked dirty first.
    pub fn collect(&mut self, host: &dyn TreeHost, id: NodeId, metadata: Option<NodeMetadata>) {
        if !self.config.collects {
            return;
        }
        if self.config.collects_updates {
            self.mark_dirty(host, id, host.parent(id));
        }
        self.insert(host, id, metadata);
    }

    /// Add `id` to the dirty set without touching its ancestors.
    pub fn add_node_to_update(&mut self, id: NodeId) {
        self.dirty.insert(id);
    }

    /// Whether `id` must be re-emitted.
    ///
    /// Without update tracking every node is presumed to need an update.
    pub fn should_update(&self, id: NodeId) -> bool {
        !self.config.collects_updates || self.dirty.contains(&id)
    }

    /// Raw dirty-set membership, regardless of configuration.
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.dirty.contains(&id)
    }

    pub fn has(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    /// Metadata recorded for `id`, if any.
    pub fn metadata(&self, id: NodeId) -> Option<&NodeMetadata> {
        self.entries.get(&id)?.metadata.as_ref()
    }

    /// Number of cached nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Replacement ─────────────────────────────────────────────────

    /// Move the entry of `original` onto `node`.
    ///
    /// `node` is recorded even when `original` had no entry, and it is marked
    /// dirty together with its live ancestors.
    pub fn refresh(&mut self, host: &dyn TreeHost, original: NodeId, node: NodeId) {
        let metadata = self
            .entries
            .remove(&original)
            .and_then(|entry| entry.metadata);
        self.mark_dirty(host, node, host.parent(node));
        self.insert(host, node, metadata);
        tracing::trace!(cache = %self.name, %original, %node, "refreshed entry");
    }

    /// Transfer dirtiness from `original` to its replacement `node`.
    ///
    /// `original` leaves the dirty set if it was in it; `node` is marked, and
    /// the ancestor walk starts at `original`'s parent, since `node` is
    /// usually not attached yet.
    pub fn refresh_update(&mut self, host: &dyn TreeHost, original: NodeId, node: NodeId) {
        if self.should_update(original) {
            self.dirty.remove(&original);
        }
        self.mark_dirty(host, node, host.parent(original));
    }

    /// Drop all entries and the dirty set. Configuration and the collected
    /// flag are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty.clear();
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    /// Emit one debug event per entry.
    pub fn visualize(&self, host: &dyn TreeHost) {
        for entry in self.entries.values() {
            let metadata = entry.metadata.clone().unwrap_or_default();
            tracing::debug!(
                cache = %self.name,
                node = %entry.id,
                kind = %entry.kind,
                should_update = self.dirty.contains(&entry.id),
                %metadata,
                source = %host.describe(entry.id),
                "cached node"
            );
        }
    }

    /// Emit entry and dirty counts when perf logging is enabled.
    pub fn perf_log(&self, key: Option<&str>) {
        if !self.config.perf_log {
            return;
        }
        tracing::info!(
            cache = %self.name,
            key = key.unwrap_or_default(),
            cached = self.entries.len(),
            should_update = self.dirty.len(),
            "node cache size"
        );
    }

    // ── Internals ───────────────────────────────────────────────────

    fn insert(&mut self, host: &dyn TreeHost, id: NodeId, metadata: Option<NodeMetadata>) {
        let merged = match (self.entries.remove(&id), metadata) {
            (Some(old), Some(newer)) => match old.metadata {
                Some(old) => Some(old.merged(&newer)),
                None => Some(newer),
            },
            (Some(old), None) => old.metadata,
            (None, metadata) => metadata,
        };
        let metadata = merged.filter(|m| !m.is_empty());
        self.entries.insert(
            id,
            CacheEntry {
                id,
                kind: host.kind(id),
                metadata,
            },
        );
        self.has_ever_collected = true;
    }

    /// Mark `id` and its ancestors dirty.
    ///
    /// The ancestor walk starts at `parent` and stops at the first ancestor
    /// already in the set, which also bounds the walk on cyclic chains.
    fn mark_dirty(&mut self, host: &dyn TreeHost, id: NodeId, parent: Option<NodeId>) {
        self.dirty.insert(id);
        let mut current = parent;
        while let Some(ancestor) = current {
            if !self.dirty.insert(ancestor) {
                break;
            }
            current = host.parent(ancestor);
        }
        self.has_ever_collected = true;
    }
}
