//! Function body memoization.
//!
//! The rewritten body is laid out as
//!
//! ```text
//! <leading declarations of lowered default parameters>
//! const __memo_scope = __memo_context.scope<T>(__memo_id + <id>, <count>);
//! const __memo_parameter_a = __memo_scope.param(0, a), ...;   // if count > 0
//! if (__memo_scope.unchanged) <early return>
//! <original statements, parameter reads and returns rewritten>
//! <final recache return>                                     // if reachable
//! ```

use memo_ir::{
    ensure_sufficient_stack, NodeData, NodeId, ScriptFunction, SyntaxTree, TreeHost,
};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{wrap_return, RewriteCx};
use crate::{analysis, factory, RewriteError};

pub(super) struct BodyOptions {
    /// Positional identity key; `None` allocates a fresh identity.
    pub call_name: Option<String>,
    pub has_receiver: bool,
    pub expect_return: Option<NodeId>,
}

/// Memoize `body` in place. Opted-out or already memoized bodies are left
/// untouched.
pub(super) fn memoize_body(
    cx: &mut RewriteCx<'_>,
    func: &ScriptFunction,
    body: NodeId,
    opts: &BodyOptions,
) -> Result<(), RewriteError> {
    let mut params = analysis::declared_params(cx.tree, &func.params, opts.has_receiver);
    let gensym_count = analysis::fix_gensym_params(cx.tree, &mut params, body);
    if analysis::has_unmemoized_scope(cx.tree, body, gensym_count) {
        tracing::debug!(%body, "body opted out of memoization");
        return Ok(());
    }
    let params = analysis::filter_memo_skip_params(cx.tree, cx.caches, params);
    let return_type = func.return_type.or(opts.expect_return);
    let is_void = analysis::is_void_type(cx.tree, return_type);
    let add_last_return = analysis::may_add_last_return(cx.tree, body);

    let (statements, annotations) = match cx.tree.data(body) {
        NodeData::Block {
            statements,
            annotations,
        } => (statements.clone(), annotations.clone()),
        _ => return Ok(()),
    };
    let (leading, rest) = statements.split_at(gensym_count.min(statements.len()));

    let refs = References {
        params: params.iter().map(|info| info.name.clone()).collect(),
        nested: false,
    };
    let scoped = refs.enter_block(cx.tree, rest);
    let refs = scoped.as_ref().unwrap_or(&refs);
    let mut rewritten = Vec::with_capacity(rest.len());
    for stmt in rest {
        rewritten.push(rewrite_references(cx, *stmt, refs)?);
    }

    let scope_type = match return_type {
        Some(ty) if !is_void => cx.clone_subtree(ty)?,
        _ => cx.tree.alloc(NodeData::Undefined),
    };
    let hash = cx.ids.id(opts.call_name.as_deref());
    tracing::debug!(
        call_name = ?opts.call_name,
        hash,
        params = params.len(),
        is_void,
        "memoized function body"
    );

    let mut out = Vec::with_capacity(statements.len() + 4);
    out.extend_from_slice(leading);
    out.push(factory::scope_declaration(
        cx.tree,
        Some(scope_type),
        hash,
        params.len(),
    ));
    if !params.is_empty() {
        let names: Vec<&str> = params.iter().map(|info| info.name.as_str()).collect();
        out.push(factory::memo_parameter_declaration(cx.tree, &names));
    }
    out.push(factory::unchanged_guard(cx.tree, is_void));
    out.extend(rewritten);
    if add_last_return {
        let call = factory::recache_call(cx.tree, None);
        out.push(factory::wrapped_return(cx.tree, call, is_void));
    }
    cx.tree.set_data(
        body,
        NodeData::Block {
            statements: out,
            annotations,
        },
    );
    Ok(())
}

// ── Reference rewriting ─────────────────────────────────────────────

/// Names read through parameter bindings, and whether we are inside a
/// nested function (whose returns belong to it, not to the memoized one).
#[derive(Clone)]
struct References {
    params: FxHashSet<String>,
    nested: bool,
}

impl References {
    /// References seen inside a block of `statements`, or `None` if the block
    /// rebinds none of the parameter names.
    fn enter_block(&self, tree: &SyntaxTree, statements: &[NodeId]) -> Option<References> {
        let shadowed: Vec<&str> = block_bindings(tree, statements)
            .into_iter()
            .filter(|name| self.params.contains(*name))
            .collect();
        if shadowed.is_empty() {
            return None;
        }
        let mut inner = self.clone();
        for name in shadowed {
            inner.params.remove(name);
        }
        Some(inner)
    }
}

/// Names bound directly by `statements`. Block-scoped bindings cover the
/// whole block, including reads before the declaration.
fn block_bindings<'t>(tree: &'t SyntaxTree, statements: &[NodeId]) -> Vec<&'t str> {
    let mut names = Vec::new();
    for stmt in statements {
        match tree.data(*stmt) {
            NodeData::VariableDeclaration { declarators, .. } => {
                for declarator in declarators {
                    if let NodeData::VariableDeclarator { name, .. } = tree.data(*declarator) {
                        names.extend(tree.ident_name(*name));
                    }
                }
            }
            NodeData::ClassDeclaration { name, .. } => names.push(name.as_str()),
            NodeData::ScriptFunction(func) => {
                names.extend(func.id.and_then(|id| tree.ident_name(id)));
            }
            _ => {}
        }
    }
    names
}

/// Rewrite parameter reads and returns below `node`.
///
/// Only expression positions are visited: declared names, member
/// properties, property keys, parameters and types are left alone. Nested
/// functions and blocks shadow the parameter names they rebind.
fn rewrite_references(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    refs: &References,
) -> Result<NodeId, RewriteError> {
    ensure_sufficient_stack(|| rewrite_references_inner(cx, node, refs))
}

fn rewrite_references_inner(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    refs: &References,
) -> Result<NodeId, RewriteError> {
    let data = cx.tree.data(node).clone();
    let nested = match &data {
        NodeData::Identifier { name } => {
            return Ok(if refs.params.contains(name) {
                factory::memo_parameter_access(cx.tree, name)
            } else {
                node
            });
        }
        NodeData::Return { argument } if !refs.nested => {
            let argument = argument
                .map(|arg| rewrite_references(cx, arg, refs))
                .transpose()?;
            return Ok(wrap_return(cx.tree, argument));
        }
        NodeData::ScriptFunction(func) => {
            let Some(body) = func.body else {
                return Ok(node);
            };
            let mut inner = refs.clone();
            inner.nested = true;
            for param in &func.params {
                if let Some(name) = cx.tree.param_name(*param) {
                    inner.params.remove(name);
                }
            }
            Some((body, inner))
        }
        _ => None,
    };
    if let Some((body, inner)) = nested {
        let rewritten = rewrite_references(cx, body, &inner)?;
        return Ok(replace_children(cx, node, data, &[(body, rewritten)]));
    }

    let scoped = match &data {
        NodeData::Block { statements, .. } => refs.enter_block(cx.tree, statements),
        _ => None,
    };
    let refs = scoped.as_ref().unwrap_or(refs);
    let mut replaced = Vec::new();
    for child in reference_children(cx.tree, &data) {
        let rewritten = rewrite_references(cx, child, refs)?;
        if rewritten != child {
            replaced.push((child, rewritten));
        }
    }
    Ok(replace_children(cx, node, data, &replaced))
}

/// Children of `data` that are in expression or statement position.
fn reference_children(tree: &SyntaxTree, data: &NodeData) -> Vec<NodeId> {
    match data {
        NodeData::Member { object, .. } => vec![*object],
        NodeData::VariableDeclarator { init, .. } => init.iter().copied().collect(),
        NodeData::Property { value, .. } | NodeData::ClassProperty { value, .. } => {
            value.iter().copied().collect()
        }
        NodeData::As { expression, .. } => vec![*expression],
        NodeData::Call { callee, args, .. } => {
            let mut out = Vec::with_capacity(args.len() + 1);
            out.push(*callee);
            out.extend_from_slice(args);
            out
        }
        NodeData::MethodDefinition { function, .. } => vec![*function],
        NodeData::Parameter { .. } | NodeData::TypeAlias { .. } => Vec::new(),
        _ => data
            .children()
            .into_iter()
            .filter(|child| !tree.kind(*child).is_type())
            .collect(),
    }
}

/// Swap rewritten children into `node` in place. Keeps the identity of
/// `node`, so enclosing statements need no rebuilding.
fn replace_children(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    mut data: NodeData,
    replaced: &[(NodeId, NodeId)],
) -> NodeId {
    if replaced.iter().all(|(old, new)| old == new) {
        return node;
    }
    let map: FxHashMap<NodeId, NodeId> = replaced.iter().copied().collect();
    data.visit_children_mut(&mut |slot| {
        if let Some(new) = map.get(slot) {
            *slot = *new;
        }
    });
    cx.tree.set_data(node, data);
    node
}
