//! Per-kind rewrite rules.
//!
//! Each rule takes one node and the metadata the collector cached for it,
//! and returns the node that should stand in its place. Rules follow one of
//! two edit styles:
//!
//! - **Replace**: build a new node with [`RewriteCx::update`]. The tree
//!   records the original and the registry hook carries cache entries and
//!   dirtiness over. The caller attaches the returned node.
//! - **In place**: functions and parameters keep their identity and are
//!   edited with `set_data`; the returned id is the input id.
//!
//! A rule applied to the wrong kind fails with
//! [`RewriteError::UnexpectedKind`]. Missing metadata is never an error; a
//! rule with nothing to do returns its input.

mod body;

use memo_cache::{CacheRegistry, NodeMetadata, PositionalIdTracker};
use memo_ir::{
    ensure_sufficient_stack, MethodKind, NodeData, NodeId, NodeKind, SyntaxTree, TreeHost,
};

use crate::{analysis, factory, names, RewriteError};

/// Everything a rule may touch while rewriting.
pub struct RewriteCx<'a> {
    pub tree: &'a mut SyntaxTree,
    /// Observer for every structural edit a rule makes.
    pub caches: &'a mut CacheRegistry,
    /// Positional identities of the source unit being rewritten.
    pub ids: &'a mut PositionalIdTracker,
}

impl<'a> RewriteCx<'a> {
    pub fn new(
        tree: &'a mut SyntaxTree,
        caches: &'a mut CacheRegistry,
        ids: &'a mut PositionalIdTracker,
    ) -> Self {
        RewriteCx { tree, caches, ids }
    }

    /// Replace `id` with a new node built from `data`, notifying the caches.
    pub fn update(&mut self, id: NodeId, data: NodeData) -> Result<NodeId, RewriteError> {
        Ok(self.tree.update(id, data, &mut *self.caches)?)
    }

    /// Deep-copy `id`, mirroring the active cache onto the copy.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, RewriteError> {
        Ok(self.tree.clone_subtree(id, &mut *self.caches)?)
    }
}

fn unexpected(tree: &SyntaxTree, node: NodeId, expected: NodeKind) -> RewriteError {
    RewriteError::UnexpectedKind {
        node,
        expected,
        found: tree.kind(node),
    }
}

/// A boolean metadata field, `false` when unset or without metadata.
fn flag(meta: Option<&NodeMetadata>, field: fn(&NodeMetadata) -> Option<bool>) -> bool {
    meta.and_then(field).unwrap_or(false)
}

// ── Types ───────────────────────────────────────────────────────────

/// Rewrite any type node; kinds without a type rule are returned as-is.
pub(crate) fn rewrite_type(
    cx: &mut RewriteCx<'_>,
    ty: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    ensure_sufficient_stack(|| match cx.tree.kind(ty) {
        NodeKind::FunctionType => rewrite_function_type(cx, ty, meta),
        NodeKind::UnionType => rewrite_union_type(cx, ty, meta),
        NodeKind::TypeReference => rewrite_type_reference(cx, ty, meta),
        _ => Ok(ty),
    })
}

fn rewrite_types(
    cx: &mut RewriteCx<'_>,
    types: Vec<NodeId>,
    meta: Option<&NodeMetadata>,
) -> Result<Vec<NodeId>, RewriteError> {
    types
        .into_iter()
        .map(|ty| rewrite_type(cx, ty, meta))
        .collect()
}

pub fn rewrite_union_type(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::UnionType { types } = cx.tree.data(node).clone() else {
        return Err(unexpected(cx.tree, node, NodeKind::UnionType));
    };
    let types = rewrite_types(cx, types, meta)?;
    cx.update(node, NodeData::UnionType { types })
}

/// Add the hidden parameters to a function type.
///
/// `forbid_type_rewrite` keeps the type as written, except for `@memo`
/// function types inside type arguments.
pub fn rewrite_function_type(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::FunctionType {
        params,
        return_type,
        has_receiver,
        annotations,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::FunctionType));
    };
    let forbidden = flag(meta, |m| m.forbid_type_rewrite);
    let within_type_params = flag(meta, |m| m.is_within_type_params)
        && annotations.iter().any(|anno| anno == names::ANNOTATION_MEMO);
    if forbidden && !within_type_params {
        return Ok(node);
    }
    let receiver = meta.and_then(|m| m.has_receiver).unwrap_or(has_receiver);
    if factory::has_hidden_parameters(cx.tree, &params, receiver) {
        return Ok(node);
    }
    let params = factory::hidden_parameters_if_not_added(cx.tree, &params, receiver);
    cx.update(
        node,
        NodeData::FunctionType {
            params,
            return_type,
            has_receiver,
            annotations,
        },
    )
}

/// Rewrite the type arguments of a reference that sits in type arguments.
pub fn rewrite_type_reference(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::TypeReference { name, type_args } = cx.tree.data(node).clone() else {
        return Err(unexpected(cx.tree, node, NodeKind::TypeReference));
    };
    if !flag(meta, |m| m.is_within_type_params) || type_args.is_empty() {
        return Ok(node);
    }
    let type_args = rewrite_types(cx, type_args, meta)?;
    cx.update(node, NodeData::TypeReference { name, type_args })
}

/// The aliased type is rewritten without the alias' metadata.
pub fn rewrite_type_alias(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    _meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::TypeAlias {
        name,
        type_annotation,
        annotations,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::TypeAlias));
    };
    let Some(ty) = type_annotation else {
        return Ok(node);
    };
    let ty = rewrite_type(cx, ty, None)?;
    cx.update(
        node,
        NodeData::TypeAlias {
            name,
            type_annotation: Some(ty),
            annotations,
        },
    )
}

// ── Declarations ────────────────────────────────────────────────────

/// Rewrite a parameter's type in place.
pub fn rewrite_parameter(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::Parameter {
        name,
        type_annotation,
        initializer,
        annotations,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::Parameter));
    };
    let Some(ty) = type_annotation else {
        return Ok(node);
    };
    let rewritten = rewrite_type(cx, ty, meta)?;
    if rewritten != ty {
        cx.tree.set_data(
            node,
            NodeData::Parameter {
                name,
                type_annotation: Some(rewritten),
                initializer,
                annotations,
            },
        );
    }
    Ok(node)
}

pub fn rewrite_class_property(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::ClassProperty {
        key,
        type_annotation,
        value,
        annotations,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::ClassProperty));
    };
    let type_annotation = type_annotation
        .map(|ty| rewrite_type(cx, ty, meta))
        .transpose()?;
    let value = match value {
        Some(value) if cx.tree.kind(value) == NodeKind::ArrowFunction => {
            Some(rewrite_arrow_function(cx, value, meta)?)
        }
        other => other,
    };
    cx.update(
        node,
        NodeData::ClassProperty {
            key,
            type_annotation,
            value,
            annotations,
        },
    )
}

/// Rewrite a variable declarator's type and its function initializer.
///
/// An arrow initializer without its own return type takes the one from the
/// declared function type. In a conditional initializer only the alternate
/// is rewritten.
pub fn rewrite_variable_declarator(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::VariableDeclarator {
        name,
        type_annotation,
        init,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::VariableDeclarator));
    };
    let expect_return = analysis::local_return_type(cx.tree, type_annotation);
    let type_annotation = type_annotation
        .map(|ty| rewrite_type(cx, ty, None))
        .transpose()?;
    let init = init
        .map(|init| rewrite_declarator_init(cx, init, meta, expect_return))
        .transpose()?;
    cx.update(
        node,
        NodeData::VariableDeclarator {
            name,
            type_annotation,
            init,
        },
    )
}

fn rewrite_declarator_init(
    cx: &mut RewriteCx<'_>,
    init: NodeId,
    meta: Option<&NodeMetadata>,
    expect_return: Option<NodeId>,
) -> Result<NodeId, RewriteError> {
    match cx.tree.data(init).clone() {
        NodeData::ArrowFunction { .. } => rewrite_arrow(cx, init, meta, expect_return),
        NodeData::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let alternate = match cx.tree.data(alternate).clone() {
                NodeData::ArrowFunction { .. } => rewrite_arrow(cx, alternate, meta, expect_return)?,
                NodeData::As {
                    expression,
                    type_annotation,
                    is_const,
                } => {
                    let expression = if cx.tree.kind(expression) == NodeKind::ArrowFunction {
                        rewrite_arrow(cx, expression, meta, expect_return)?
                    } else {
                        expression
                    };
                    let type_annotation = rewrite_type(cx, type_annotation, None)?;
                    cx.update(
                        alternate,
                        NodeData::As {
                            expression,
                            type_annotation,
                            is_const,
                        },
                    )?
                }
                _ => alternate,
            };
            cx.update(
                init,
                NodeData::Conditional {
                    test,
                    consequent,
                    alternate,
                },
            )
        }
        _ => Ok(init),
    }
}

/// Rewrite an object-literal property whose value is a function.
pub fn rewrite_property(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::Property { key, value } = cx.tree.data(node).clone() else {
        return Err(unexpected(cx.tree, node, NodeKind::Property));
    };
    let Some(value) = value.filter(|value| analysis::is_arrow_value(cx.tree, *value)) else {
        return Ok(node);
    };
    let value = if cx.tree.kind(value) == NodeKind::ArrowFunction {
        rewrite_arrow_function(cx, value, meta)?
    } else {
        rewrite_as_expression(cx, value, meta)?
    };
    cx.update(
        node,
        NodeData::Property {
            key,
            value: Some(value),
        },
    )
}

/// `(() => ...) as T`: the arrow is rewritten on its own, the asserted type
/// with the assertion's metadata.
pub fn rewrite_as_expression(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::As {
        expression,
        type_annotation,
        is_const,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::AsExpression));
    };
    let expression = if cx.tree.kind(expression) == NodeKind::ArrowFunction {
        rewrite_arrow_function(cx, expression, None)?
    } else {
        expression
    };
    let type_annotation = rewrite_type(cx, type_annotation, meta)?;
    cx.update(
        node,
        NodeData::As {
            expression,
            type_annotation,
            is_const,
        },
    )
}

// ── Functions ───────────────────────────────────────────────────────

pub fn rewrite_arrow_function(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    rewrite_arrow(cx, node, meta, None)
}

fn rewrite_arrow(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
    expect_return: Option<NodeId>,
) -> Result<NodeId, RewriteError> {
    let NodeData::ArrowFunction { function } = cx.tree.data(node).clone() else {
        return Err(unexpected(cx.tree, node, NodeKind::ArrowFunction));
    };
    let function = rewrite_script_function(cx, function, meta, expect_return)?;
    cx.update(node, NodeData::ArrowFunction { function })
}

/// Memoize a function in place.
///
/// Ordinary functions gain the hidden parameters. Setters only have their
/// value parameter's type rewritten and getters their return type; neither
/// has its body touched, nor do declared functions.
///
/// The body is memoized unless the metadata marks the function as a memo
/// entry or an intrinsic. Intrinsic functions, and functions flagged for the
/// internals transformer, have their intrinsic calls lowered instead.
/// `expect_return` stands in for a missing return type.
#[tracing::instrument(level = "debug", skip_all, fields(node = %node))]
pub fn rewrite_script_function(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
    expect_return: Option<NodeId>,
) -> Result<NodeId, RewriteError> {
    let NodeData::ScriptFunction(mut func) = cx.tree.data(node).clone() else {
        return Err(unexpected(cx.tree, node, NodeKind::ScriptFunction));
    };
    let is_setter = flag(meta, |m| m.is_setter);
    let is_getter = flag(meta, |m| m.is_getter);
    let has_memo_entry = flag(meta, |m| m.has_memo_entry);
    let has_memo_intrinsic = flag(meta, |m| m.has_memo_intrinsic);
    let has_receiver = meta
        .and_then(|m| m.has_receiver)
        .unwrap_or(func.has_receiver);
    let accessor_meta = NodeMetadata {
        has_receiver: Some(has_receiver),
        is_within_type_params: meta.and_then(|m| m.is_within_type_params),
        ..NodeMetadata::default()
    };

    if is_setter {
        let at = usize::from(has_receiver && func.params.len() == 2);
        if let Some(param) = func.params.get(at).copied() {
            func.params[at] = rewrite_parameter(cx, param, Some(&accessor_meta))?;
        }
    } else if !is_getter {
        func.params = factory::hidden_parameters_if_not_added(cx.tree, &func.params, has_receiver);
    }
    if is_getter {
        if let Some(ty) = func.return_type {
            func.return_type = Some(rewrite_type(cx, ty, Some(&accessor_meta))?);
        }
    }

    let body = func
        .body
        .filter(|body| cx.tree.kind(*body) == NodeKind::Block);
    if let Some(body) = body.filter(|_| !(is_getter || is_setter || func.is_declare)) {
        if has_memo_intrinsic || flag(meta, |m| m.internals_transformer) {
            crate::transform_internals(cx.tree, body);
        }
        if !has_memo_entry && !has_memo_intrinsic {
            let call_name = meta.and_then(|m| m.call_name.clone()).or_else(|| {
                func.id
                    .and_then(|id| cx.tree.ident_name(id))
                    .map(str::to_owned)
            });
            body::memoize_body(
                cx,
                &func,
                body,
                &body::BodyOptions {
                    call_name,
                    has_receiver,
                    expect_return,
                },
            )?;
        }
    }

    cx.tree.set_data(node, NodeData::ScriptFunction(func));
    Ok(node)
}

/// Rewrite a method and its overloads.
///
/// The method name is the default call name; getter and setter flags come
/// from the method kind, whatever the metadata says.
pub fn rewrite_method_definition(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::MethodDefinition {
        kind,
        name,
        function,
        overloads,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::MethodDefinition));
    };
    let mut method_meta = NodeMetadata {
        call_name: cx.tree.ident_name(name).map(str::to_owned),
        ..NodeMetadata::default()
    };
    if let Some(meta) = meta {
        method_meta.merge(meta);
    }
    method_meta.is_setter = Some(kind == MethodKind::Set);
    method_meta.is_getter = Some(kind == MethodKind::Get);

    let function = rewrite_script_function(cx, function, Some(&method_meta), None)?;
    let overloads = overloads
        .into_iter()
        .map(|overload| rewrite_method_definition(cx, overload, meta))
        .collect::<Result<Vec<_>, _>>()?;
    cx.update(
        node,
        NodeData::MethodDefinition {
            kind,
            name,
            function,
            overloads,
        },
    )
}

// ── Expressions and statements ──────────────────────────────────────

/// Pass the hidden arguments to a memoized callee.
///
/// The arguments go first, or right after the receiver argument when a
/// receiver is forwarded as a plain argument. Memo entry calls supply their
/// own context and are left alone.
pub fn rewrite_call_expression(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::Call {
        callee,
        type_args,
        args,
    } = cx.tree.data(node).clone()
    else {
        return Err(unexpected(cx.tree, node, NodeKind::CallExpression));
    };
    if flag(meta, |m| m.has_memo_entry) {
        return Ok(node);
    }
    if args
        .iter()
        .take(2)
        .any(|arg| cx.tree.ident_name(*arg) == Some(names::CONTEXT))
    {
        return Ok(node);
    }

    let callee_is_member = cx.tree.kind(callee) == NodeKind::MemberExpression;
    let at = if flag(meta, |m| m.has_receiver) && !callee_is_member {
        if args.is_empty() {
            return Err(RewriteError::UnsupportedCallShape {
                node,
                reason: "receiver call without a receiver argument",
            });
        }
        1
    } else {
        0
    };

    let call_name = meta
        .and_then(|m| m.call_name.as_deref())
        .map(|fallback| callee_name(cx.tree, callee).unwrap_or(fallback).to_owned());
    let hash = cx.ids.id(call_name.as_deref());
    tracing::trace!(%node, call_name = ?call_name, hash, "hidden arguments");

    let mut new_args = Vec::with_capacity(args.len() + 2);
    new_args.extend_from_slice(&args[..at]);
    new_args.extend(factory::hidden_arguments(cx.tree, hash));
    new_args.extend_from_slice(&args[at..]);
    cx.update(
        node,
        NodeData::Call {
            callee,
            type_args,
            args: new_args,
        },
    )
}

/// `f` for `f(...)`, `m` for `x.m(...)`.
fn callee_name(tree: &SyntaxTree, callee: NodeId) -> Option<&str> {
    match tree.data(callee) {
        NodeData::Identifier { name } => Some(name),
        NodeData::Member { property, .. } => tree.ident_name(*property),
        _ => None,
    }
}

/// `a` becomes `__memo_parameter_a.value`.
///
/// Compiler-generated and memo runtime names are left alone.
pub fn rewrite_identifier(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    _meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::Identifier { name } = cx.tree.data(node).clone() else {
        return Err(unexpected(cx.tree, node, NodeKind::Identifier));
    };
    if names::is_gensym(&name) || names::is_memo_runtime(&name) {
        return Ok(node);
    }
    Ok(factory::memo_parameter_access(cx.tree, &name))
}

/// `return x;` becomes `return __memo_scope.recache(x);`, and `return;`
/// becomes `{ __memo_scope.recache(); return; }`.
pub fn rewrite_return_statement(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    _meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    let NodeData::Return { argument } = cx.tree.data(node).clone() else {
        return Err(unexpected(cx.tree, node, NodeKind::ReturnStatement));
    };
    if argument.is_some_and(|arg| is_recache_call(cx.tree, arg)) {
        return Ok(node);
    }
    Ok(wrap_return(cx.tree, argument))
}

pub(crate) fn wrap_return(tree: &mut SyntaxTree, argument: Option<NodeId>) -> NodeId {
    let call = factory::recache_call(tree, argument);
    factory::wrapped_return(tree, call, argument.is_none())
}

fn is_recache_call(tree: &SyntaxTree, expr: NodeId) -> bool {
    let NodeData::Call { callee, .. } = tree.data(expr) else {
        return false;
    };
    let NodeData::Member {
        object, property, ..
    } = tree.data(*callee)
    else {
        return false;
    };
    tree.ident_name(*object) == Some(names::SCOPE)
        && tree.ident_name(*property) == Some(names::INTERNAL_VALUE_NEW)
}

#[cfg(test)]
mod tests;
