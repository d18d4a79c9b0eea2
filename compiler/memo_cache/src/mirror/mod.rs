//! Lock-step walk of an original subtree and its structural clone.
//!
//! Used by the clone hook to copy cache entries from original identities to
//! the clone's identities. The walk is pre-order and deterministic, driven by
//! an explicit stack so deep trees cannot overflow the call stack.

use memo_ir::{NodeId, TreeHost};

use crate::{CacheError, MirrorWalkMode, NodeCache};

/// Visit `(original, cloned)` pairs in pre-order.
///
/// `on_pair` returns `true` to skip the children of that pair. The two
/// subtrees must have the same child count at every visited level; a
/// mismatch fails with [`CacheError::NonIsomorphic`] before any child of the
/// offending pair is visited.
pub fn mirror_walk<F>(
    host: &dyn TreeHost,
    original: NodeId,
    cloned: NodeId,
    mut on_pair: F,
) -> Result<(), CacheError>
where
    F: FnMut(NodeId, NodeId) -> bool,
{
    let mut stack = vec![(original, cloned)];
    while let Some((left, right)) = stack.pop() {
        if on_pair(left, right) {
            continue;
        }
        let left_children = host.children(left);
        let right_children = host.children(right);
        if left_children.len() != right_children.len() {
            return Err(CacheError::NonIsomorphic {
                original: left,
                cloned: right,
                original_len: left_children.len(),
                cloned_len: right_children.len(),
            });
        }
        // Reversed so the first child is popped first.
        stack.extend(
            left_children
                .into_iter()
                .zip(right_children)
                .rev(),
        );
    }
    Ok(())
}

/// Copy `cache` entries from the `original` subtree onto `cloned`.
///
/// With `refresh`, entries move and the clone is marked dirty; otherwise
/// they are collected onto the clone and the originals keep theirs.
pub(crate) fn copy_cache_to_cloned_node(
    cache: &mut NodeCache,
    host: &dyn TreeHost,
    original: NodeId,
    cloned: NodeId,
    refresh: bool,
    mode: MirrorWalkMode,
) -> Result<(), CacheError> {
    let mut copied = 0usize;
    mirror_walk(host, original, cloned, |left, right| {
        let Some(entry) = cache.get(left) else {
            return mode == MirrorWalkMode::Pruned;
        };
        if refresh {
            cache.refresh(host, left, right);
        } else {
            let metadata = entry.metadata.clone();
            cache.collect(host, right, metadata);
        }
        copied += 1;
        false
    })?;
    tracing::trace!(cache = cache.name(), %original, %cloned, copied, "mirrored cache entries");
    Ok(())
}
