//! Error types for cache operations.

use memo_ir::NodeId;

/// Errors raised while keeping caches consistent with the tree.
///
/// Missing entries are never errors: lookups answer `None`/`false`. Only
/// broken preconditions of the structural hooks end up here.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The mirror walk found a pair whose child lists differ in length.
    #[error(
        "clone {cloned} is not isomorphic to {original}: {original_len} children vs {cloned_len}"
    )]
    NonIsomorphic {
        /// Node in the original subtree.
        original: NodeId,
        /// Corresponding node in the clone.
        cloned: NodeId,
        /// Child count of `original`.
        original_len: usize,
        /// Child count of `cloned`.
        cloned_len: usize,
    },
}
