//! Error types for the memo rewrite.

use memo_cache::CacheError;
use memo_ir::{NodeId, NodeKind};

/// Errors a rewrite rule reports to the pass that invoked it.
///
/// Absent metadata is not an error; rules fall back to returning their input.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// A rule was applied to a node of the wrong kind.
    #[error("expected {expected} at {node}, found {found}")]
    UnexpectedKind {
        node: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },

    /// A call site cannot receive hidden arguments.
    #[error("unsupported call shape at {node}: {reason}")]
    UnsupportedCallShape { node: NodeId, reason: &'static str },

    /// A structural hook failed while the rule edited the tree.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
