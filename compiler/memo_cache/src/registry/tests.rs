#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use super::*;
use crate::{NodeMetadata, MEMO_CACHE, UI_CACHE};
use memo_ir::{NodeData, SyntaxTree};
use pretty_assertions::assert_eq;

/// `{ f(); }` as (block, stmt, call).
fn sample(tree: &mut SyntaxTree) -> (NodeId, NodeId, NodeId) {
    let f = tree.ident("f");
    let call = tree.call(f, Vec::new());
    let stmt = tree.expr_stmt(call);
    let block = tree.block(vec![stmt]);
    (block, stmt, call)
}

fn named(name: &str) -> Option<NodeMetadata> {
    Some(NodeMetadata {
        call_name: Some(name.to_string()),
        ..NodeMetadata::default()
    })
}

#[test]
fn get_cache_creates_once() {
    let mut registry = CacheRegistry::new();
    registry.get_cache(MEMO_CACHE).should_collect_update(true);
    assert!(registry.get_cache(MEMO_CACHE).config().collects_updates);
    assert_eq!(registry.len(), 1);
    assert!(registry.cache(UI_CACHE).is_none());
}

#[test]
fn has_targets_one_cache_or_all() {
    let mut tree = SyntaxTree::new();
    let (_, stmt, call) = sample(&mut tree);
    let mut registry = CacheRegistry::new();
    registry.get_cache(UI_CACHE).collect(&tree, stmt, None);
    registry.get_cache(MEMO_CACHE).collect(&tree, call, None);

    assert!(registry.has(stmt, None));
    assert!(registry.has(stmt, Some(UI_CACHE)));
    assert!(!registry.has(stmt, Some(MEMO_CACHE)));
    assert!(!registry.has(stmt, Some("missing")));
}

#[test]
fn active_metadata_reads_only_the_active_cache() {
    let mut tree = SyntaxTree::new();
    let (_, stmt, _) = sample(&mut tree);
    let mut registry = CacheRegistry::new();
    registry.get_cache(UI_CACHE).collect(&tree, stmt, named("ui"));
    registry.get_cache(MEMO_CACHE).collect(&tree, stmt, named("memo"));

    assert!(registry.active_metadata(stmt).is_none());
    registry.set_active(Some(MEMO_CACHE));
    assert_eq!(
        registry.active_metadata(stmt).and_then(|m| m.call_name.as_deref()),
        Some("memo")
    );
    registry.set_active(Some("missing"));
    assert!(registry.active_metadata(stmt).is_none());
}

#[test]
fn should_update_with_unknown_name_is_false() {
    let mut tree = SyntaxTree::new();
    let (block, ..) = sample(&mut tree);
    let mut registry = CacheRegistry::new();
    registry.get_cache(MEMO_CACHE);
    assert!(registry.should_update(block, None));
    assert!(registry.should_update(block, Some(MEMO_CACHE)));
    assert!(!registry.should_update(block, Some("missing")));
}

#[test]
fn update_hook_refreshes_every_cache() {
    let mut tree = SyntaxTree::new();
    let (block, stmt, call) = sample(&mut tree);
    let mut registry = CacheRegistry::new();
    registry.get_cache(UI_CACHE).collect(&tree, stmt, named("ui"));
    registry
        .get_cache(MEMO_CACHE)
        .should_collect_update(true)
        .collect(&tree, stmt, named("memo"));

    let updated = tree
        .update(
            stmt,
            NodeData::ExpressionStatement { expression: call },
            &mut registry,
        )
        .unwrap();

    assert!(!registry.has(stmt, None));
    let ui = registry.cache(UI_CACHE).unwrap();
    let memo = registry.cache(MEMO_CACHE).unwrap();
    assert_eq!(ui.metadata(updated), named("ui").as_ref());
    assert_eq!(memo.metadata(updated), named("memo").as_ref());
    assert!(!memo.is_dirty(stmt));
    assert!(memo.is_dirty(updated));
    assert!(memo.is_dirty(block));
}

#[test]
fn refresh_skips_caches_without_the_original() {
    let mut tree = SyntaxTree::new();
    let (_, stmt, call) = sample(&mut tree);
    let replacement = tree.expr_stmt(call);
    let mut registry = CacheRegistry::new();
    registry.get_cache(UI_CACHE).collect(&tree, stmt, None);
    registry.get_cache(MEMO_CACHE);

    registry.refresh(&tree, stmt, replacement, None);

    assert!(registry.has(replacement, Some(UI_CACHE)));
    assert!(!registry.has(replacement, Some(MEMO_CACHE)));
}

#[test]
fn clone_hook_mirrors_only_the_active_cache() {
    let mut tree = SyntaxTree::new();
    let (block, _, call) = sample(&mut tree);
    let mut registry = CacheRegistry::new();
    registry.get_cache(UI_CACHE).collect(&tree, call, named("ui"));
    registry.get_cache(MEMO_CACHE).collect(&tree, call, named("memo"));
    registry.set_active(Some(MEMO_CACHE));

    let cloned = tree.clone_subtree(block, &mut registry).unwrap();
    let cloned_stmt = tree.statements(cloned).unwrap()[0];
    let NodeData::ExpressionStatement { expression } = tree.data(cloned_stmt) else {
        panic!("expected an expression statement");
    };
    let cloned_call = *expression;

    assert!(registry.has(call, Some(MEMO_CACHE)));
    assert_eq!(
        registry.cache(MEMO_CACHE).unwrap().metadata(cloned_call),
        named("memo").as_ref()
    );
    assert!(!registry.has(cloned_call, Some(UI_CACHE)));
}

#[test]
fn clone_hook_without_active_cache_copies_nothing() {
    let mut tree = SyntaxTree::new();
    let (block, ..) = sample(&mut tree);
    let mut registry = CacheRegistry::new();
    registry.get_cache(MEMO_CACHE).collect(&tree, block, None);

    let cloned = tree.clone_subtree(block, &mut registry).unwrap();

    assert!(!registry.has(cloned, None));
    assert_eq!(registry.active(), None);
}

#[test]
fn clear_drops_every_cache() {
    let mut tree = SyntaxTree::new();
    let (block, ..) = sample(&mut tree);
    let mut registry = CacheRegistry::new();
    registry.get_cache(MEMO_CACHE).collect(&tree, block, None);
    registry.get_cache(UI_CACHE);

    registry.clear();

    assert!(registry.is_empty());
    assert!(!registry.has(block, None));
}
