//! Tree host capability and mutation hooks.
//!
//! The annotation cache never owns the tree. It reads structure through
//! `TreeHost`, and it learns about structural edits through
//! `MutationObserver`, which the host calls after it has performed them.

use smallvec::SmallVec;

use crate::{NodeId, NodeKind};

/// Read access to a syntax tree addressed by identity.
pub trait TreeHost {
    /// Syntactic kind of the node.
    fn kind(&self, id: NodeId) -> NodeKind;

    /// Live parent of the node, if it is attached.
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Children in source order.
    ///
    /// Structurally isomorphic trees return the same number of children in
    /// the same order at every level.
    fn children(&self, id: NodeId) -> SmallVec<[NodeId; 4]>;

    /// The node this one replaced through an in-place update, if any.
    fn original(&self, id: NodeId) -> Option<NodeId>;

    /// Human-readable rendering of the node, used by cache diagnostics.
    fn describe(&self, id: NodeId) -> String {
        format!("{} {id}", self.kind(id))
    }
}

/// Notification points a host calls after structural mutations.
///
/// Both hooks run after the host has finished the edit, so the observer sees
/// the cloned or updated node already allocated. A hook error aborts the edit
/// that triggered it and is returned to the caller of the host primitive.
pub trait MutationObserver {
    type Error;

    /// `cloned` is a fresh structural copy of the subtree rooted at `original`.
    fn on_clone(
        &mut self,
        host: &dyn TreeHost,
        original: NodeId,
        cloned: NodeId,
    ) -> Result<(), Self::Error> {
        let _ = (host, original, cloned);
        Ok(())
    }

    /// `updated` replaces `original` in place. `host.original(updated)` is
    /// `Some(original)` and `updated` is not yet attached to a parent.
    fn on_update(
        &mut self,
        host: &dyn TreeHost,
        original: NodeId,
        updated: NodeId,
    ) -> Result<(), Self::Error> {
        let _ = (host, original, updated);
        Ok(())
    }
}

/// No-op observer for edits nobody needs to track.
impl MutationObserver for () {
    type Error = std::convert::Infallible;
}
