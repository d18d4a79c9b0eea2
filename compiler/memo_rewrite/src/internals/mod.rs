//! Intrinsic call lowering.
//!
//! Inside `@memo_intrinsic` functions the memo context and positional id are
//! spelled as calls, `__context()` and `__id()`. They become plain reads of
//! the hidden parameters.

use memo_ir::{NodeData, NodeId, SyntaxTree};

use crate::names;

/// Replace intrinsic calls below `root` with the hidden parameter they name.
///
/// Edits parents in place and returns how many calls were lowered.
pub fn transform_internals(tree: &mut SyntaxTree, root: NodeId) -> usize {
    let mut lowered = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let mut data = tree.data(node).clone();
        let mut changed = false;
        data.visit_children_mut(&mut |child| match intrinsic_target(tree, *child) {
            Some(name) => {
                *child = tree.ident(name);
                changed = true;
                lowered += 1;
            }
            None => stack.push(*child),
        });
        if changed {
            tree.set_data(node, data);
        }
    }
    tracing::debug!(%root, lowered, "lowered memo intrinsics");
    lowered
}

/// Hidden parameter read by an intrinsic call, if `id` is one.
fn intrinsic_target(tree: &SyntaxTree, id: NodeId) -> Option<&'static str> {
    let NodeData::Call { callee, args, .. } = tree.data(id) else {
        return None;
    };
    if !args.is_empty() {
        return None;
    }
    match tree.ident_name(*callee)? {
        names::INTRINSIC_CONTEXT => Some(names::CONTEXT),
        names::INTRINSIC_ID => Some(names::ID),
        _ => None,
    }
}
