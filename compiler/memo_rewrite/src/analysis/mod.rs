//! Read-only questions the rewrite rules ask about functions and bodies.

use memo_cache::CacheRegistry;
use memo_ir::{NodeData, NodeId, NodeKind, PrimitiveType, SyntaxTree, TreeHost};

use crate::names;

/// A parameter that takes part in memoization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParamInfo {
    pub param: NodeId,
    /// Name the body uses for the parameter. Differs from the declared name
    /// for lowered default parameters.
    pub name: String,
}

/// Declared parameters, minus the receiver and the hidden pair.
pub(crate) fn declared_params(
    tree: &SyntaxTree,
    params: &[NodeId],
    has_receiver: bool,
) -> Vec<ParamInfo> {
    params
        .iter()
        .skip(usize::from(has_receiver))
        .filter_map(|param| {
            let name = tree.param_name(*param)?;
            if name == names::CONTEXT || name == names::ID {
                return None;
            }
            Some(ParamInfo {
                param: *param,
                name: name.to_owned(),
            })
        })
        .collect()
}

/// Point lowered default parameters at their local declarations.
///
/// Lowering turns `a: T = d` into a `gensym%%_` parameter plus a leading
/// `let a = ...` statement, one per such parameter, in parameter order.
/// A `gensym%%_` parameter without its declaration keeps its declared name
/// and consumes no statement. Returns how many leading statements belong to
/// those declarations.
pub(crate) fn fix_gensym_params(
    tree: &SyntaxTree,
    params: &mut [ParamInfo],
    body: NodeId,
) -> usize {
    let statements = tree.statements(body).unwrap_or_default();
    let mut count = 0;
    for info in params.iter_mut() {
        if !info.name.starts_with(names::GENSYM_INTRINSIC) {
            continue;
        }
        let Some(local) = statements
            .get(count)
            .and_then(|stmt| first_declared_name(tree, *stmt))
        else {
            tracing::debug!(param = %info.param, "lowered parameter without declaration");
            continue;
        };
        info.name = local.to_owned();
        count += 1;
    }
    count
}

fn first_declared_name(tree: &SyntaxTree, stmt: NodeId) -> Option<&str> {
    let NodeData::VariableDeclaration { declarators, .. } = tree.data(stmt) else {
        return None;
    };
    match tree.data(*declarators.first()?) {
        NodeData::VariableDeclarator { name, .. } => tree.ident_name(*name),
        _ => None,
    }
}

/// Drop parameters excluded from memoization, either annotated `@memo_skip`
/// or collected with `has_memo_skip` into the active cache.
pub(crate) fn filter_memo_skip_params(
    tree: &SyntaxTree,
    caches: &CacheRegistry,
    params: Vec<ParamInfo>,
) -> Vec<ParamInfo> {
    params
        .into_iter()
        .filter(|info| !is_memo_skip(tree, caches, info.param))
        .collect()
}

fn is_memo_skip(tree: &SyntaxTree, caches: &CacheRegistry, param: NodeId) -> bool {
    tree.data(param).has_annotation(names::ANNOTATION_MEMO_SKIP)
        || caches
            .active_metadata(param)
            .and_then(|meta| meta.has_memo_skip)
            .unwrap_or(false)
}

/// Whether the body opts out of memoization or is already memoized.
///
/// Opting out means a block annotated `@memo_unmemoized` anywhere in the
/// body outside nested functions. Already memoized means the statement after
/// the leading declarations declares the scope handle.
pub(crate) fn has_unmemoized_scope(tree: &SyntaxTree, body: NodeId, gensym_count: usize) -> bool {
    let statements = tree.statements(body).unwrap_or_default();
    if statements
        .get(gensym_count)
        .is_some_and(|stmt| declares_scope(tree, *stmt))
    {
        return true;
    }
    let mut stack: Vec<NodeId> = statements.to_vec();
    while let Some(node) = stack.pop() {
        let data = tree.data(node);
        if data.kind() == NodeKind::Block && data.has_annotation(names::ANNOTATION_MEMO_UNMEMOIZED) {
            return true;
        }
        if data.kind().is_function_like() {
            continue;
        }
        stack.extend(data.children());
    }
    false
}

fn declares_scope(tree: &SyntaxTree, stmt: NodeId) -> bool {
    first_declared_name(tree, stmt) == Some(names::SCOPE)
}

/// Whether a return type makes the function void-like.
///
/// No return type counts as void.
pub(crate) fn is_void_type(tree: &SyntaxTree, ty: Option<NodeId>) -> bool {
    let Some(ty) = ty else {
        return true;
    };
    match tree.data(ty) {
        NodeData::Primitive(PrimitiveType::Void) => true,
        NodeData::TypeReference { name, type_args } => name == "void" && type_args.is_empty(),
        _ => false,
    }
}

/// Whether control can fall off the end of the body.
///
/// Only a trailing `return` or `throw` is treated as terminal.
pub(crate) fn may_add_last_return(tree: &SyntaxTree, body: NodeId) -> bool {
    match tree.statements(body).and_then(<[NodeId]>::last) {
        Some(last) => !matches!(
            tree.kind(*last),
            NodeKind::ReturnStatement | NodeKind::ThrowStatement
        ),
        None => true,
    }
}

/// Return type of the function type inside a variable's annotation.
///
/// Looks through one level of union, e.g. `(() => number) | undefined`.
pub(crate) fn local_return_type(tree: &SyntaxTree, annotation: Option<NodeId>) -> Option<NodeId> {
    let annotation = annotation?;
    match tree.data(annotation) {
        NodeData::FunctionType { return_type, .. } => *return_type,
        NodeData::UnionType { types } => types.iter().find_map(|ty| match tree.data(*ty) {
            NodeData::FunctionType { return_type, .. } => *return_type,
            _ => None,
        }),
        _ => None,
    }
}

/// Whether an expression is an arrow function, or an arrow function under
/// an `as` assertion.
pub(crate) fn is_arrow_value(tree: &SyntaxTree, expr: NodeId) -> bool {
    match tree.data(expr) {
        NodeData::ArrowFunction { .. } => true,
        NodeData::As { expression, .. } => tree.kind(*expression) == NodeKind::ArrowFunction,
        _ => false,
    }
}
