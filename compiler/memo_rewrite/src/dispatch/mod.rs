//! Node kind to rewrite rule table.
//!
//! Built once on first use and shared for the life of the process, like the
//! formatter's static lookup tables.

use std::sync::OnceLock;

use memo_cache::NodeMetadata;
use memo_ir::{NodeId, NodeKind};
use rustc_hash::FxHashMap;

use crate::rules::{self, RewriteCx};
use crate::RewriteError;

/// A rewrite rule: node in, replacement (or the same node) out.
pub type RewriteFn =
    fn(&mut RewriteCx<'_>, NodeId, Option<&NodeMetadata>) -> Result<NodeId, RewriteError>;

/// The rule for `kind`, if memoization rewrites that kind.
pub fn rewrite_by_kind(kind: NodeKind) -> Option<RewriteFn> {
    static TABLE: OnceLock<FxHashMap<NodeKind, RewriteFn>> = OnceLock::new();
    TABLE.get_or_init(build_table).get(&kind).copied()
}

fn build_table() -> FxHashMap<NodeKind, RewriteFn> {
    let entries: [(NodeKind, RewriteFn); 15] = [
        (NodeKind::UnionType, rules::rewrite_union_type),
        (NodeKind::FunctionType, rules::rewrite_function_type),
        (NodeKind::TypeReference, rules::rewrite_type_reference),
        (NodeKind::TypeAlias, rules::rewrite_type_alias),
        (NodeKind::Parameter, rules::rewrite_parameter),
        (NodeKind::ClassProperty, rules::rewrite_class_property),
        (NodeKind::ArrowFunction, rules::rewrite_arrow_function),
        (NodeKind::ScriptFunction, script_function),
        (NodeKind::MethodDefinition, rules::rewrite_method_definition),
        (NodeKind::CallExpression, rules::rewrite_call_expression),
        (NodeKind::Identifier, rules::rewrite_identifier),
        (NodeKind::ReturnStatement, rules::rewrite_return_statement),
        (NodeKind::VariableDeclarator, rules::rewrite_variable_declarator),
        (NodeKind::Property, rules::rewrite_property),
        (NodeKind::AsExpression, rules::rewrite_as_expression),
    ];
    entries.into_iter().collect()
}

fn script_function(
    cx: &mut RewriteCx<'_>,
    node: NodeId,
    meta: Option<&NodeMetadata>,
) -> Result<NodeId, RewriteError> {
    rules::rewrite_script_function(cx, node, meta, None)
}
