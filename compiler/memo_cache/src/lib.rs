//! Memo Cache - Incremental Annotation Cache
//!
//! Per-node metadata keyed by `NodeId` that stays consistent while passes
//! clone and replace nodes:
//! - `NodeCache`: one named cache with its entries and dirty set
//! - `CacheRegistry`: every named cache, plus the structural hooks
//! - `mirror_walk`: lock-step traversal of an original subtree and its clone
//! - `PositionalIdTracker`: stable call-site identities per source unit
//!
//! # Dirty Propagation
//!
//! A node in the dirty set must be re-emitted rather than reused. Marking a
//! node also marks its ancestors, stopping at the first ancestor that is
//! already dirty, so the set stays closed upward without revisiting chains.
//!
//! # Lifecycle
//!
//! Caches are created on first access by name and live for the whole
//! transformation session. A consuming pass calls `NodeCache::clear` once its
//! rewrites are applied; `CacheRegistry::clear` drops every cache.

mod cache;
mod config;
mod error;
mod ids;
mod metadata;
mod mirror;
mod registry;

pub use cache::{CacheEntry, NodeCache};
pub use config::{CacheConfig, MirrorWalkMode};
pub use error::CacheError;
pub use ids::{for_unit, PositionalIdTracker};
pub use metadata::NodeMetadata;
pub use mirror::mirror_walk;
pub use registry::CacheRegistry;

/// Cache used by the UI lowering pass.
pub const UI_CACHE: &str = "ui";

/// Cache used by the memo rewrite pass.
pub const MEMO_CACHE: &str = "memo";
