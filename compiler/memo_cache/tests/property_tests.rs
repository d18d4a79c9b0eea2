//! Property-based tests for the annotation cache.
//!
//! Random trees are generated as parent vectors and materialized as nested
//! blocks. The properties checked:
//! 1. Ancestor closure: a dirty node's cached parent is dirty
//! 2. Monotonicity: the dirty set only shrinks by the node a transfer names
//! 3. Collect merge: two collects equal one collect of the merged metadata
//! 4. Mirror copy: a full copy caches exactly the cloned positions

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    clippy::redundant_closure_for_method_calls,
    reason = "Proptest macros generate code with these patterns"
)]

use memo_cache::{mirror_walk, CacheRegistry, NodeCache, NodeMetadata, MEMO_CACHE};
use memo_ir::{NodeId, SyntaxTree, TreeHost};
use proptest::prelude::*;
use proptest::sample::Index;

// -- Tree Generation --

/// Parent choices: node `k + 1` hangs under one of the nodes before it.
fn parents_strategy() -> impl Strategy<Value = Vec<Index>> {
    prop::collection::vec(any::<Index>(), 0..40)
}

/// Build a tree from parent choices; returns node ids indexed by position.
fn build_tree(tree: &mut SyntaxTree, parents: &[Index]) -> Vec<NodeId> {
    let count = parents.len() + 1;
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (k, choice) in parents.iter().enumerate() {
        children[choice.index(k + 1)].push(k + 1);
    }
    let mut ids: Vec<Option<NodeId>> = vec![None; count];
    // Children always have higher positions, so allocate back to front.
    for position in (0..count).rev() {
        let statements = children[position]
            .iter()
            .map(|child| ids[*child].unwrap())
            .collect();
        ids[position] = Some(tree.block(statements));
    }
    ids.into_iter().map(|id| id.unwrap()).collect()
}

#[derive(Clone, Debug)]
enum Op {
    Collect(Index),
    AddNodeToUpdate(Index),
    RefreshUpdate(Index),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<Index>().prop_map(Op::Collect),
        any::<Index>().prop_map(Op::AddNodeToUpdate),
        any::<Index>().prop_map(Op::RefreshUpdate),
    ]
}

fn metadata_strategy() -> impl Strategy<Value = NodeMetadata> {
    let flag = || proptest::option::of(any::<bool>());
    (
        proptest::option::of("[a-z]{1,6}"),
        flag(),
        flag(),
        flag(),
        flag(),
        flag(),
        flag(),
        flag(),
        flag(),
        flag(),
    )
        .prop_map(
            |(
                call_name,
                has_receiver,
                is_setter,
                is_getter,
                has_memo_entry,
                has_memo_intrinsic,
                has_memo_skip,
                forbid_type_rewrite,
                is_within_type_params,
                internals_transformer,
            )| NodeMetadata {
                call_name,
                has_receiver,
                is_setter,
                is_getter,
                has_memo_entry,
                has_memo_intrinsic,
                has_memo_skip,
                forbid_type_rewrite,
                is_within_type_params,
                internals_transformer,
            },
        )
}

fn tracking_cache() -> NodeCache {
    let mut cache = NodeCache::new(MEMO_CACHE);
    cache.should_collect_update(true);
    cache
}

fn dirty_set(cache: &NodeCache, ids: &[NodeId]) -> Vec<NodeId> {
    ids.iter().copied().filter(|id| cache.is_dirty(*id)).collect()
}

fn assert_closed(tree: &SyntaxTree, cache: &NodeCache, ids: &[NodeId]) {
    for id in ids {
        if !cache.is_dirty(*id) {
            continue;
        }
        if let Some(parent) = tree.parent(*id) {
            if cache.has(parent) {
                assert!(
                    cache.is_dirty(parent),
                    "dirty {id} has clean cached parent {parent}"
                );
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn collect_keeps_ancestor_closure(
        parents in parents_strategy(),
        picks in prop::collection::vec(any::<Index>(), 1..20),
    ) {
        let mut tree = SyntaxTree::new();
        let ids = build_tree(&mut tree, &parents);
        let mut cache = tracking_cache();
        for pick in picks {
            cache.collect(&tree, *pick.get(&ids), None);
            assert_closed(&tree, &cache, &ids);
        }
    }

    #[test]
    fn dirty_set_only_loses_transferred_nodes(
        parents in parents_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..30),
    ) {
        let mut tree = SyntaxTree::new();
        let ids = build_tree(&mut tree, &parents);
        let mut cache = tracking_cache();
        for op in ops {
            let before = dirty_set(&cache, &ids);
            let transferred = match op {
                Op::Collect(pick) => {
                    cache.collect(&tree, *pick.get(&ids), None);
                    None
                }
                Op::AddNodeToUpdate(pick) => {
                    cache.add_node_to_update(*pick.get(&ids));
                    None
                }
                Op::RefreshUpdate(pick) => {
                    let original = *pick.get(&ids);
                    let replacement = tree.block(Vec::new());
                    cache.refresh_update(&tree, original, replacement);
                    prop_assert!(cache.is_dirty(replacement));
                    Some(original)
                }
            };
            for id in before {
                if Some(id) != transferred {
                    prop_assert!(cache.is_dirty(id), "{} left the dirty set", id);
                }
            }
        }
    }

    #[test]
    fn two_collects_equal_one_merged_collect(
        first in metadata_strategy(),
        second in metadata_strategy(),
    ) {
        let mut tree = SyntaxTree::new();
        let node = tree.block(Vec::new());

        let mut twice = NodeCache::new(MEMO_CACHE);
        twice.collect(&tree, node, Some(first.clone()));
        twice.collect(&tree, node, Some(second.clone()));

        let mut once = NodeCache::new(MEMO_CACHE);
        once.collect(&tree, node, Some(first.merged(&second)));

        prop_assert_eq!(twice.get(node), once.get(node));
    }

    #[test]
    fn full_mirror_copy_caches_exactly_cloned_positions(
        parents in parents_strategy(),
        cached in prop::collection::vec(any::<bool>(), 41),
        meta in metadata_strategy(),
    ) {
        let mut tree = SyntaxTree::new();
        let ids = build_tree(&mut tree, &parents);
        let root = ids[0];
        let mut registry = CacheRegistry::new();
        for (id, on) in ids.iter().zip(&cached) {
            if *on {
                registry.get_cache(MEMO_CACHE).collect(&tree, *id, Some(meta.clone()));
            }
        }
        registry.set_active(Some(MEMO_CACHE));

        let cloned = tree.clone_subtree(root, &mut registry).unwrap();

        let cache = registry.get_cache(MEMO_CACHE);
        let mut pairs = Vec::new();
        mirror_walk(&tree, root, cloned, |left, right| {
            pairs.push((left, right));
            false
        })
        .unwrap();
        prop_assert_eq!(pairs.len(), ids.len());
        for (left, right) in pairs {
            prop_assert_eq!(cache.has(left), cache.has(right));
            prop_assert_eq!(cache.metadata(left), cache.metadata(right));
        }
    }
}
