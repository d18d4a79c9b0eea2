//! Node identities.
//!
//! A `NodeId` names exactly one node instance for the lifetime of the tree
//! that allocated it. Two ids are equal iff they refer to the same node.
//! Ids are hash keys only; no arithmetic or ordering is performed on them.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a tree node.
///
/// # Design
/// - Memory: 4 bytes
/// - Equality: O(1) integer compare
/// - Deliberately not `Ord`: identities are never ordered
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a new `NodeId` from an arena index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    /// Get the index into the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Hash for NodeId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
