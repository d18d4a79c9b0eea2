//! Cache-driven memo pass.
//!
//! The collector records which nodes need memoization in a named cache. The
//! pass walks the tree pre-order and, for every cached node that still needs
//! an update and whose kind has a rule, applies that rule with the cached
//! metadata. Rewritten nodes are put back where the original was attached,
//! and the walk continues into the replacement's children.
//!
//! While the pass runs its cache is the registry's active cache, so clones
//! made by the rules carry their cache entries along.

use memo_cache::{CacheRegistry, NodeCache, PositionalIdTracker};
use memo_ir::{NodeId, SyntaxTree, TreeHost};

use crate::{rewrite_by_kind, MemoPassConfig, RewriteCx, RewriteError};

/// One memo rewrite over a tree.
#[derive(Clone, Debug, Default)]
pub struct MemoPass {
    config: MemoPassConfig,
}

impl MemoPass {
    pub fn new(config: MemoPassConfig) -> Self {
        MemoPass { config }
    }

    pub fn config(&self) -> &MemoPassConfig {
        &self.config
    }

    /// Rewrite the tree rooted at `root`. Returns the root, which is a new
    /// node if the root itself was replaced.
    ///
    /// The registry's active cache and mirror mode are restored afterwards,
    /// even when a rule fails.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(cache = %self.config.cache_name, unit = %ids.unit())
    )]
    pub fn run(
        &self,
        tree: &mut SyntaxTree,
        caches: &mut CacheRegistry,
        ids: &mut PositionalIdTracker,
        root: NodeId,
    ) -> Result<NodeId, RewriteError> {
        let previous_active = caches.active().map(str::to_owned);
        let previous_mode = caches.mirror_mode();
        caches.set_active(Some(&self.config.cache_name));
        caches.set_mirror_mode(self.config.mirror_mode);

        let result = self.walk(tree, caches, ids, root);

        caches.set_active(previous_active.as_deref());
        caches.set_mirror_mode(previous_mode);
        let root = result?;

        let name = self.config.cache_name.as_str();
        caches.perf_log(name, true);
        if self.config.clear_after_pass && caches.cache(name).is_some() {
            caches.get_cache(name).clear();
        }
        Ok(root)
    }

    /// [`MemoPass::run`] with the process-wide tracker of `unit`.
    pub fn run_unit(
        &self,
        tree: &mut SyntaxTree,
        caches: &mut CacheRegistry,
        unit: &str,
        root: NodeId,
    ) -> Result<NodeId, RewriteError> {
        let tracker = memo_cache::for_unit(unit);
        let mut ids = tracker.lock();
        self.run(tree, caches, &mut ids, root)
    }

    fn walk(
        &self,
        tree: &mut SyntaxTree,
        caches: &mut CacheRegistry,
        ids: &mut PositionalIdTracker,
        root: NodeId,
    ) -> Result<NodeId, RewriteError> {
        let name = self.config.cache_name.as_str();
        if !caches.cache(name).is_some_and(NodeCache::is_collected) {
            tracing::debug!("nothing collected, skipping walk");
            return Ok(root);
        }
        let mut new_root = root;
        let mut rewritten = 0usize;
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            let mut current = node;
            let rule = if caches.has(node, Some(name)) && caches.should_update(node, Some(name)) {
                rewrite_by_kind(tree.kind(node))
            } else {
                None
            };
            if let Some(rule) = rule {
                let meta = caches
                    .cache(name)
                    .and_then(|cache| cache.metadata(node))
                    .cloned();
                let mut cx = RewriteCx::new(tree, caches, ids);
                current = rule(&mut cx, node, meta.as_ref())?;
                rewritten += 1;
                if current != node && !tree.replace_in_parent(node, current) {
                    new_root = current;
                }
                tracing::trace!(%node, %current, kind = %tree.kind(current), "rewrote node");
            }
            stack.extend(tree.children(current).into_iter().rev());
        }

        tracing::debug!(rewritten, "memo pass finished");
        Ok(new_root)
    }
}
