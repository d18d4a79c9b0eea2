//! Builders for the synthetic nodes of a memoized function.
//!
//! Every builder allocates fresh, detached nodes. None of them goes through
//! [`SyntaxTree::update`], so the cache hooks never see these nodes as
//! replacements of cached ones.

use memo_ir::{
    BinaryOp, DeclarationKind, MemberKind, NodeData, NodeId, PrimitiveType, ScriptFunction,
    SyntaxTree,
};

use crate::names;

// ── Parameters ──────────────────────────────────────────────────────

/// `__memo_context: __memo_context_type`
pub fn context_parameter(tree: &mut SyntaxTree) -> NodeId {
    let ty = tree.type_ref(names::CONTEXT_TYPE);
    tree.param(names::CONTEXT, Some(ty))
}

/// `__memo_id: __memo_id_type`
pub fn id_parameter(tree: &mut SyntaxTree) -> NodeId {
    let ty = tree.type_ref(names::ID_TYPE);
    tree.param(names::ID, Some(ty))
}

pub fn hidden_parameters(tree: &mut SyntaxTree) -> [NodeId; 2] {
    [context_parameter(tree), id_parameter(tree)]
}

/// Whether the hidden pair already follows the receiver in `params`.
pub fn has_hidden_parameters(tree: &SyntaxTree, params: &[NodeId], has_receiver: bool) -> bool {
    let at = usize::from(has_receiver);
    params
        .get(at)
        .and_then(|param| tree.param_name(*param))
        .is_some_and(|name| name == names::CONTEXT)
}

/// `params` with the hidden pair inserted after the receiver, unless present.
pub fn hidden_parameters_if_not_added(
    tree: &mut SyntaxTree,
    params: &[NodeId],
    has_receiver: bool,
) -> Vec<NodeId> {
    if has_hidden_parameters(tree, params, has_receiver) {
        return params.to_vec();
    }
    let at = usize::from(has_receiver).min(params.len());
    let mut out = Vec::with_capacity(params.len() + 2);
    out.extend_from_slice(&params[..at]);
    out.extend(hidden_parameters(tree));
    out.extend_from_slice(&params[at..]);
    out
}

// ── Arguments ───────────────────────────────────────────────────────

/// `__memo_context`
pub fn context_argument(tree: &mut SyntaxTree) -> NodeId {
    tree.ident(names::CONTEXT)
}

/// `__memo_id + <hash>`
pub fn id_argument(tree: &mut SyntaxTree, hash: u32) -> NodeId {
    let left = tree.ident(names::ID);
    let right = tree.number(i64::from(hash));
    tree.alloc(NodeData::Binary {
        op: BinaryOp::Add,
        left,
        right,
    })
}

pub fn hidden_arguments(tree: &mut SyntaxTree, hash: u32) -> [NodeId; 2] {
    [context_argument(tree), id_argument(tree, hash)]
}

// ── Parameter bindings ──────────────────────────────────────────────

/// `__memo_parameter_<name>`
pub fn memo_parameter_identifier(tree: &mut SyntaxTree, name: &str) -> NodeId {
    tree.ident(names::memo_parameter(name))
}

/// `__memo_parameter_<name>.value`
pub fn memo_parameter_access(tree: &mut SyntaxTree, name: &str) -> NodeId {
    let object = memo_parameter_identifier(tree, name);
    let property = tree.ident(names::VALUE);
    tree.member(object, property, MemberKind::Getter)
}

/// `const __memo_parameter_a = __memo_scope.param(0, a), ...;`
pub fn memo_parameter_declaration<S: AsRef<str>>(tree: &mut SyntaxTree, params: &[S]) -> NodeId {
    let declarators = params
        .iter()
        .enumerate()
        .map(|(slot, name)| memo_parameter_declarator(tree, slot, name.as_ref()))
        .collect();
    tree.alloc(NodeData::VariableDeclaration {
        kind: DeclarationKind::Const,
        declarators,
    })
}

fn memo_parameter_declarator(tree: &mut SyntaxTree, slot: usize, name: &str) -> NodeId {
    let binding = memo_parameter_identifier(tree, name);
    let callee = scope_member(tree, names::INTERNAL_PARAMETER_STATE, MemberKind::PropertyAccess);
    let slot = tree.number(i64::try_from(slot).unwrap_or(i64::MAX));
    let value = tree.ident(name);
    let init = tree.call(callee, vec![slot, value]);
    tree.alloc(NodeData::VariableDeclarator {
        name: binding,
        type_annotation: None,
        init: Some(init),
    })
}

// ── Scope handle ────────────────────────────────────────────────────

/// `__memo_scope.<member>`
fn scope_member(tree: &mut SyntaxTree, member: &str, kind: MemberKind) -> NodeId {
    let object = tree.ident(names::SCOPE);
    let property = tree.ident(member);
    tree.member(object, property, kind)
}

/// `const __memo_scope = __memo_context.scope<T>(__memo_id + <hash>, <count>);`
///
/// `T` is `return_type`, or `void` without one.
pub fn scope_declaration(
    tree: &mut SyntaxTree,
    return_type: Option<NodeId>,
    hash: u32,
    count: usize,
) -> NodeId {
    let object = tree.ident(names::CONTEXT);
    let property = tree.ident(names::INTERNAL_SCOPE);
    let callee = tree.member(object, property, MemberKind::PropertyAccess);
    let type_arg = match return_type {
        Some(ty) => ty,
        None => tree.primitive(PrimitiveType::Void),
    };
    let id = id_argument(tree, hash);
    let count = tree.number(i64::try_from(count).unwrap_or(i64::MAX));
    let init = tree.alloc(NodeData::Call {
        callee,
        type_args: vec![type_arg],
        args: vec![id, count],
    });
    let name = tree.ident(names::SCOPE);
    let declarator = tree.alloc(NodeData::VariableDeclarator {
        name,
        type_annotation: None,
        init: Some(init),
    });
    tree.alloc(NodeData::VariableDeclaration {
        kind: DeclarationKind::Const,
        declarators: vec![declarator],
    })
}

/// `__memo_scope.recache(<arg>)`
pub fn recache_call(tree: &mut SyntaxTree, arg: Option<NodeId>) -> NodeId {
    let callee = scope_member(tree, names::INTERNAL_VALUE_NEW, MemberKind::PropertyAccess);
    tree.call(callee, arg.into_iter().collect())
}

/// `return __memo_scope.cached;`
pub fn synthetic_return(tree: &mut SyntaxTree) -> NodeId {
    let cached = scope_member(tree, names::INTERNAL_VALUE, MemberKind::None);
    tree.ret(Some(cached))
}

/// `if (__memo_scope.unchanged) <early return>`
///
/// The early return yields the cached value, or for void functions reads it
/// as a statement and returns nothing.
pub fn unchanged_guard(tree: &mut SyntaxTree, is_void: bool) -> NodeId {
    let test = scope_member(tree, names::INTERNAL_VALUE_OK, MemberKind::None);
    let consequent = if is_void {
        let cached = scope_member(tree, names::INTERNAL_VALUE, MemberKind::None);
        let read = tree.expr_stmt(cached);
        let ret = tree.ret(None);
        tree.block(vec![read, ret])
    } else {
        synthetic_return(tree)
    };
    tree.alloc(NodeData::If {
        test,
        consequent,
        alternate: None,
    })
}

/// `return <call>;`, or `{ <call>; return; }` for void functions.
pub fn wrapped_return(tree: &mut SyntaxTree, call: NodeId, is_void: bool) -> NodeId {
    if is_void {
        let stmt = tree.expr_stmt(call);
        let ret = tree.ret(None);
        tree.block(vec![stmt, ret])
    } else {
        tree.ret(Some(call))
    }
}

// ── Compute ─────────────────────────────────────────────────────────

/// `() => { return <expr>; }`
pub fn lambda_wrapper(tree: &mut SyntaxTree, expr: NodeId) -> NodeId {
    let ret = tree.ret(Some(expr));
    let body = tree.block(vec![ret]);
    let function = tree.alloc(NodeData::ScriptFunction(ScriptFunction {
        body: Some(body),
        ..ScriptFunction::default()
    }));
    tree.alloc(NodeData::ArrowFunction { function })
}

/// `__memo_context.compute(__memo_id + <hash>, () => { return <expr>; })`
pub fn compute_expression(tree: &mut SyntaxTree, hash: u32, expr: NodeId) -> NodeId {
    let object = tree.ident(names::CONTEXT);
    let property = tree.ident(names::COMPUTE);
    let callee = tree.member(object, property, MemberKind::PropertyAccess);
    let id = id_argument(tree, hash);
    let lambda = lambda_wrapper(tree, expr);
    tree.call(callee, vec![id, lambda])
}
