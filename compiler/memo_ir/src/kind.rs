//! Node kind tags.

use std::fmt;

/// Syntactic kind of a tree node.
///
/// Recorded in cache entries at collection time and used as the dispatch key
/// of the rewrite table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
    Program,
    ClassDeclaration,
    MethodDefinition,
    ScriptFunction,
    ArrowFunction,
    Parameter,
    Identifier,
    Block,
    VariableDeclaration,
    VariableDeclarator,
    ReturnStatement,
    ExpressionStatement,
    IfStatement,
    ThrowStatement,
    CallExpression,
    MemberExpression,
    BinaryExpression,
    ConditionalExpression,
    NumberLiteral,
    StringLiteral,
    ThisExpression,
    ObjectExpression,
    Property,
    ClassProperty,
    TypeAlias,
    AsExpression,
    UnionType,
    FunctionType,
    TypeReference,
    PrimitiveType,
    UndefinedType,
}

impl NodeKind {
    /// Whether this kind is a type annotation node.
    pub const fn is_type(self) -> bool {
        matches!(
            self,
            NodeKind::UnionType
                | NodeKind::FunctionType
                | NodeKind::TypeReference
                | NodeKind::PrimitiveType
                | NodeKind::UndefinedType
        )
    }

    /// Whether this kind owns a function body scope.
    pub const fn is_function_like(self) -> bool {
        matches!(
            self,
            NodeKind::ScriptFunction | NodeKind::ArrowFunction | NodeKind::MethodDefinition
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
