//! Arena-backed syntax tree.
//!
//! Nodes live in a flat `Vec` and reference their children by `NodeId`.
//! Every node knows its live parent, and nodes produced by [`SyntaxTree::update`]
//! remember the node they replaced.
//!
//! Two mutation styles exist, mirroring how rewrite rules edit a host tree:
//! - [`SyntaxTree::set_data`] edits a node in place. Its identity is unchanged
//!   and no hook runs.
//! - [`SyntaxTree::update`] allocates a replacement node that records the
//!   original, then notifies the observer. The replacement is detached until
//!   the caller puts it somewhere.
//!
//! [`SyntaxTree::clone_subtree`] deep-copies a subtree into fresh identities,
//! preserving shape, then notifies the observer.

use smallvec::SmallVec;

use crate::{ensure_sufficient_stack, MutationObserver, NodeId, NodeKind, TreeHost};

/// Kind of a method definition.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MethodKind {
    Method,
    Get,
    Set,
    Constructor,
}

/// `const` or `let`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeclarationKind {
    Const,
    Let,
}

/// How a member expression is accessed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MemberKind {
    /// `object.property` used as a call target or value.
    PropertyAccess,
    /// `object.property` resolved through a getter.
    Getter,
    /// No access kind recorded.
    None,
}

/// Binary operators that survive into the lowered tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
        }
    }
}

/// Primitive type keywords.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PrimitiveType {
    Void,
    Number,
    Boolean,
    String,
}

impl PrimitiveType {
    pub const fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Void => "void",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::String => "string",
        }
    }
}

/// A function with an optional name, used by declarations, methods and arrows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptFunction {
    /// `Identifier` naming the function.
    pub id: Option<NodeId>,
    /// `Parameter` nodes. With a receiver, the first one is `this`.
    pub params: Vec<NodeId>,
    pub return_type: Option<NodeId>,
    /// Usually a `Block`; `None` for signatures.
    pub body: Option<NodeId>,
    pub has_receiver: bool,
    /// Ambient (`declare`) function.
    pub is_declare: bool,
    pub annotations: Vec<String>,
}

/// Node payload. Child references are `NodeId`s into the same tree.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Program {
        statements: Vec<NodeId>,
    },
    ClassDeclaration {
        name: String,
        members: Vec<NodeId>,
    },
    MethodDefinition {
        kind: MethodKind,
        /// `Identifier`.
        name: NodeId,
        /// `ScriptFunction`.
        function: NodeId,
        /// `MethodDefinition` overloads of the same name.
        overloads: Vec<NodeId>,
    },
    ScriptFunction(ScriptFunction),
    ArrowFunction {
        function: NodeId,
    },
    Parameter {
        name: NodeId,
        type_annotation: Option<NodeId>,
        initializer: Option<NodeId>,
        annotations: Vec<String>,
    },
    Identifier {
        name: String,
    },
    Block {
        statements: Vec<NodeId>,
        annotations: Vec<String>,
    },
    VariableDeclaration {
        kind: DeclarationKind,
        declarators: Vec<NodeId>,
    },
    VariableDeclarator {
        name: NodeId,
        type_annotation: Option<NodeId>,
        init: Option<NodeId>,
    },
    Return {
        argument: Option<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    Throw {
        argument: NodeId,
    },
    Call {
        callee: NodeId,
        type_args: Vec<NodeId>,
        args: Vec<NodeId>,
    },
    Member {
        object: NodeId,
        property: NodeId,
        kind: MemberKind,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    NumberLiteral {
        value: i64,
    },
    StringLiteral {
        value: String,
    },
    This,
    Object {
        properties: Vec<NodeId>,
    },
    Property {
        key: NodeId,
        value: Option<NodeId>,
    },
    ClassProperty {
        key: NodeId,
        type_annotation: Option<NodeId>,
        value: Option<NodeId>,
        annotations: Vec<String>,
    },
    TypeAlias {
        name: NodeId,
        type_annotation: Option<NodeId>,
        annotations: Vec<String>,
    },
    As {
        expression: NodeId,
        type_annotation: NodeId,
        is_const: bool,
    },
    UnionType {
        types: Vec<NodeId>,
    },
    FunctionType {
        params: Vec<NodeId>,
        return_type: Option<NodeId>,
        has_receiver: bool,
        annotations: Vec<String>,
    },
    TypeReference {
        name: String,
        type_args: Vec<NodeId>,
    },
    Primitive(PrimitiveType),
    Undefined,
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Program { .. } => NodeKind::Program,
            NodeData::ClassDeclaration { .. } => NodeKind::ClassDeclaration,
            NodeData::MethodDefinition { .. } => NodeKind::MethodDefinition,
            NodeData::ScriptFunction(_) => NodeKind::ScriptFunction,
            NodeData::ArrowFunction { .. } => NodeKind::ArrowFunction,
            NodeData::Parameter { .. } => NodeKind::Parameter,
            NodeData::Identifier { .. } => NodeKind::Identifier,
            NodeData::Block { .. } => NodeKind::Block,
            NodeData::VariableDeclaration { .. } => NodeKind::VariableDeclaration,
            NodeData::VariableDeclarator { .. } => NodeKind::VariableDeclarator,
            NodeData::Return { .. } => NodeKind::ReturnStatement,
            NodeData::ExpressionStatement { .. } => NodeKind::ExpressionStatement,
            NodeData::If { .. } => NodeKind::IfStatement,
            NodeData::Throw { .. } => NodeKind::ThrowStatement,
            NodeData::Call { .. } => NodeKind::CallExpression,
            NodeData::Member { .. } => NodeKind::MemberExpression,
            NodeData::Binary { .. } => NodeKind::BinaryExpression,
            NodeData::Conditional { .. } => NodeKind::ConditionalExpression,
            NodeData::NumberLiteral { .. } => NodeKind::NumberLiteral,
            NodeData::StringLiteral { .. } => NodeKind::StringLiteral,
            NodeData::This => NodeKind::ThisExpression,
            NodeData::Object { .. } => NodeKind::ObjectExpression,
            NodeData::Property { .. } => NodeKind::Property,
            NodeData::ClassProperty { .. } => NodeKind::ClassProperty,
            NodeData::TypeAlias { .. } => NodeKind::TypeAlias,
            NodeData::As { .. } => NodeKind::AsExpression,
            NodeData::UnionType { .. } => NodeKind::UnionType,
            NodeData::FunctionType { .. } => NodeKind::FunctionType,
            NodeData::TypeReference { .. } => NodeKind::TypeReference,
            NodeData::Primitive(_) => NodeKind::PrimitiveType,
            NodeData::Undefined => NodeKind::UndefinedType,
        }
    }

    /// Children in source order.
    pub fn children(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        self.visit_children(&mut |child| out.push(child));
        out
    }

    /// Call `f` on every child in source order.
    pub fn visit_children(&self, f: &mut dyn FnMut(NodeId)) {
        match self {
            NodeData::Program { statements } | NodeData::Block { statements, .. } => {
                statements.iter().copied().for_each(f);
            }
            NodeData::ClassDeclaration { members, .. } => members.iter().copied().for_each(f),
            NodeData::MethodDefinition {
                name,
                function,
                overloads,
                ..
            } => {
                f(*name);
                f(*function);
                overloads.iter().copied().for_each(f);
            }
            NodeData::ScriptFunction(func) => {
                visit_opt(func.id, f);
                func.params.iter().copied().for_each(&mut *f);
                visit_opt(func.return_type, f);
                visit_opt(func.body, f);
            }
            NodeData::ArrowFunction { function } => f(*function),
            NodeData::Parameter {
                name,
                type_annotation,
                initializer,
                ..
            } => {
                f(*name);
                visit_opt(*type_annotation, f);
                visit_opt(*initializer, f);
            }
            NodeData::VariableDeclaration { declarators, .. } => {
                declarators.iter().copied().for_each(f);
            }
            NodeData::VariableDeclarator {
                name,
                type_annotation,
                init,
            } => {
                f(*name);
                visit_opt(*type_annotation, f);
                visit_opt(*init, f);
            }
            NodeData::Return { argument } => visit_opt(*argument, f),
            NodeData::ExpressionStatement { expression } => f(*expression),
            NodeData::If {
                test,
                consequent,
                alternate,
            } => {
                f(*test);
                f(*consequent);
                visit_opt(*alternate, f);
            }
            NodeData::Throw { argument } => f(*argument),
            NodeData::Call {
                callee,
                type_args,
                args,
            } => {
                f(*callee);
                type_args.iter().copied().for_each(&mut *f);
                args.iter().copied().for_each(f);
            }
            NodeData::Member {
                object, property, ..
            } => {
                f(*object);
                f(*property);
            }
            NodeData::Binary { left, right, .. } => {
                f(*left);
                f(*right);
            }
            NodeData::Conditional {
                test,
                consequent,
                alternate,
            } => {
                f(*test);
                f(*consequent);
                f(*alternate);
            }
            NodeData::Object { properties } => properties.iter().copied().for_each(f),
            NodeData::Property { key, value } => {
                f(*key);
                visit_opt(*value, f);
            }
            NodeData::ClassProperty {
                key,
                type_annotation,
                value,
                ..
            } => {
                f(*key);
                visit_opt(*type_annotation, f);
                visit_opt(*value, f);
            }
            NodeData::TypeAlias {
                name,
                type_annotation,
                ..
            } => {
                f(*name);
                visit_opt(*type_annotation, f);
            }
            NodeData::As {
                expression,
                type_annotation,
                ..
            } => {
                f(*expression);
                f(*type_annotation);
            }
            NodeData::UnionType { types } => types.iter().copied().for_each(f),
            NodeData::FunctionType {
                params,
                return_type,
                ..
            } => {
                params.iter().copied().for_each(&mut *f);
                visit_opt(*return_type, f);
            }
            NodeData::TypeReference { type_args, .. } => type_args.iter().copied().for_each(f),
            NodeData::Identifier { .. }
            | NodeData::NumberLiteral { .. }
            | NodeData::StringLiteral { .. }
            | NodeData::This
            | NodeData::Primitive(_)
            | NodeData::Undefined => {}
        }
    }

    /// Call `f` on every child slot in source order, allowing replacement.
    pub fn visit_children_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        match self {
            NodeData::Program { statements } | NodeData::Block { statements, .. } => {
                statements.iter_mut().for_each(f);
            }
            NodeData::ClassDeclaration { members, .. } => members.iter_mut().for_each(f),
            NodeData::MethodDefinition {
                name,
                function,
                overloads,
                ..
            } => {
                f(name);
                f(function);
                overloads.iter_mut().for_each(f);
            }
            NodeData::ScriptFunction(func) => {
                visit_opt_mut(&mut func.id, f);
                func.params.iter_mut().for_each(&mut *f);
                visit_opt_mut(&mut func.return_type, f);
                visit_opt_mut(&mut func.body, f);
            }
            NodeData::ArrowFunction { function } => f(function),
            NodeData::Parameter {
                name,
                type_annotation,
                initializer,
                ..
            } => {
                f(name);
                visit_opt_mut(type_annotation, f);
                visit_opt_mut(initializer, f);
            }
            NodeData::VariableDeclaration { declarators, .. } => {
                declarators.iter_mut().for_each(f);
            }
            NodeData::VariableDeclarator {
                name,
                type_annotation,
                init,
            } => {
                f(name);
                visit_opt_mut(type_annotation, f);
                visit_opt_mut(init, f);
            }
            NodeData::Return { argument } => visit_opt_mut(argument, f),
            NodeData::ExpressionStatement { expression } => f(expression),
            NodeData::If {
                test,
                consequent,
                alternate,
            } => {
                f(test);
                f(consequent);
                visit_opt_mut(alternate, f);
            }
            NodeData::Throw { argument } => f(argument),
            NodeData::Call {
                callee,
                type_args,
                args,
            } => {
                f(callee);
                type_args.iter_mut().for_each(&mut *f);
                args.iter_mut().for_each(f);
            }
            NodeData::Member {
                object, property, ..
            } => {
                f(object);
                f(property);
            }
            NodeData::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            NodeData::Conditional {
                test,
                consequent,
                alternate,
            } => {
                f(test);
                f(consequent);
                f(alternate);
            }
            NodeData::Object { properties } => properties.iter_mut().for_each(f),
            NodeData::Property { key, value } => {
                f(key);
                visit_opt_mut(value, f);
            }
            NodeData::ClassProperty {
                key,
                type_annotation,
                value,
                ..
            } => {
                f(key);
                visit_opt_mut(type_annotation, f);
                visit_opt_mut(value, f);
            }
            NodeData::TypeAlias {
                name,
                type_annotation,
                ..
            } => {
                f(name);
                visit_opt_mut(type_annotation, f);
            }
            NodeData::As {
                expression,
                type_annotation,
                ..
            } => {
                f(expression);
                f(type_annotation);
            }
            NodeData::UnionType { types } => types.iter_mut().for_each(f),
            NodeData::FunctionType {
                params,
                return_type,
                ..
            } => {
                params.iter_mut().for_each(&mut *f);
                visit_opt_mut(return_type, f);
            }
            NodeData::TypeReference { type_args, .. } => type_args.iter_mut().for_each(f),
            NodeData::Identifier { .. }
            | NodeData::NumberLiteral { .. }
            | NodeData::StringLiteral { .. }
            | NodeData::This
            | NodeData::Primitive(_)
            | NodeData::Undefined => {}
        }
    }

    /// Annotation names attached to the node, if the kind carries any.
    pub fn annotations(&self) -> &[String] {
        match self {
            NodeData::ScriptFunction(func) => &func.annotations,
            NodeData::Parameter { annotations, .. }
            | NodeData::Block { annotations, .. }
            | NodeData::ClassProperty { annotations, .. }
            | NodeData::TypeAlias { annotations, .. }
            | NodeData::FunctionType { annotations, .. } => annotations,
            _ => &[],
        }
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations().iter().any(|anno| anno == name)
    }
}

fn visit_opt(id: Option<NodeId>, f: &mut dyn FnMut(NodeId)) {
    if let Some(id) = id {
        f(id);
    }
}

fn visit_opt_mut(id: &mut Option<NodeId>, f: &mut dyn FnMut(&mut NodeId)) {
    if let Some(id) = id.as_mut() {
        f(id);
    }
}

// ── Arena ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    original: Option<NodeId>,
}

/// Arena syntax tree implementing [`TreeHost`].
#[derive(Clone, Debug, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        SyntaxTree { nodes: Vec::new() }
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a detached node and adopt its children.
    pub fn alloc(&mut self, data: NodeData) -> NodeId {
        debug_assert!(
            u32::try_from(self.nodes.len()).is_ok(),
            "syntax tree exceeded u32::MAX nodes"
        );
        #[allow(
            clippy::cast_possible_truncation,
            reason = "arena size checked against u32::MAX above"
        )]
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            original: None,
        });
        self.adopt_children(id);
        id
    }

    #[inline]
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    /// Replace a node's payload in place, keeping its identity.
    pub fn set_data(&mut self, id: NodeId, data: NodeData) {
        self.nodes[id.index()].data = data;
        self.adopt_children(id);
    }

    /// Allocate a replacement for `id` and notify the observer.
    ///
    /// The replacement records `id` as its original and is returned detached;
    /// attach it with [`SyntaxTree::replace_in_parent`] or by storing it in a
    /// parent's payload.
    pub fn update<O: MutationObserver + ?Sized>(
        &mut self,
        id: NodeId,
        data: NodeData,
        observer: &mut O,
    ) -> Result<NodeId, O::Error> {
        let updated = self.alloc(data);
        self.nodes[updated.index()].original = Some(id);
        observer.on_update(&*self, id, updated)?;
        Ok(updated)
    }

    /// Deep-copy the subtree rooted at `id` and notify the observer.
    ///
    /// The copy is detached, shares no identities with the original, and has
    /// the same shape at every level.
    pub fn clone_subtree<O: MutationObserver + ?Sized>(
        &mut self,
        id: NodeId,
        observer: &mut O,
    ) -> Result<NodeId, O::Error> {
        let cloned = self.deep_copy(id);
        observer.on_clone(&*self, id, cloned)?;
        Ok(cloned)
    }

    fn deep_copy(&mut self, id: NodeId) -> NodeId {
        ensure_sufficient_stack(|| {
            let mut data = self.data(id).clone();
            data.visit_children_mut(&mut |child| *child = self.deep_copy(*child));
            self.alloc(data)
        })
    }

    /// Swap `old` for `new` in `parent`'s child slots. Returns whether a slot matched.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let mut replaced = false;
        self.nodes[parent.index()]
            .data
            .visit_children_mut(&mut |child| {
                if *child == old {
                    *child = new;
                    replaced = true;
                }
            });
        if replaced {
            self.nodes[new.index()].parent = Some(parent);
        }
        replaced
    }

    /// Put `new` where `old` is currently attached. Returns `false` if `old` is detached.
    pub fn replace_in_parent(&mut self, old: NodeId, new: NodeId) -> bool {
        match self.nodes[old.index()].parent {
            Some(parent) => self.replace_child(parent, old, new),
            None => false,
        }
    }

    fn adopt_children(&mut self, id: NodeId) {
        for child in self.nodes[id.index()].data.children() {
            self.nodes[child.index()].parent = Some(id);
        }
    }

    // ── Convenience constructors ────────────────────────────────────

    pub fn ident(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Identifier { name: name.into() })
    }

    pub fn number(&mut self, value: i64) -> NodeId {
        self.alloc(NodeData::NumberLiteral { value })
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.alloc(NodeData::StringLiteral {
            value: value.into(),
        })
    }

    pub fn primitive(&mut self, ty: PrimitiveType) -> NodeId {
        self.alloc(NodeData::Primitive(ty))
    }

    pub fn type_ref(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeData::TypeReference {
            name: name.into(),
            type_args: Vec::new(),
        })
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.alloc(NodeData::Block {
            statements,
            annotations: Vec::new(),
        })
    }

    pub fn expr_stmt(&mut self, expression: NodeId) -> NodeId {
        self.alloc(NodeData::ExpressionStatement { expression })
    }

    pub fn ret(&mut self, argument: Option<NodeId>) -> NodeId {
        self.alloc(NodeData::Return { argument })
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.alloc(NodeData::Call {
            callee,
            type_args: Vec::new(),
            args,
        })
    }

    pub fn member(&mut self, object: NodeId, property: NodeId, kind: MemberKind) -> NodeId {
        self.alloc(NodeData::Member {
            object,
            property,
            kind,
        })
    }

    pub fn param(&mut self, name: impl Into<String>, type_annotation: Option<NodeId>) -> NodeId {
        let name = self.ident(name);
        self.alloc(NodeData::Parameter {
            name,
            type_annotation,
            initializer: None,
            annotations: Vec::new(),
        })
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Name of an `Identifier` node.
    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Name of a `Parameter` node's identifier.
    pub fn param_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Parameter { name, .. } => self.ident_name(*name),
            _ => None,
        }
    }

    pub fn script_function(&self, id: NodeId) -> Option<&ScriptFunction> {
        match self.data(id) {
            NodeData::ScriptFunction(func) => Some(func),
            _ => None,
        }
    }

    /// Statements of a `Block` or `Program`.
    pub fn statements(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.data(id) {
            NodeData::Block { statements, .. } | NodeData::Program { statements } => {
                Some(statements)
            }
            _ => None,
        }
    }

}

impl TreeHost for SyntaxTree {
    #[inline]
    fn kind(&self, id: NodeId) -> NodeKind {
        self.data(id).kind()
    }

    #[inline]
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    fn children(&self, id: NodeId) -> SmallVec<[NodeId; 4]> {
        self.data(id).children()
    }

    #[inline]
    fn original(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].original
    }

    fn describe(&self, id: NodeId) -> String {
        crate::print::print(self, id)
    }
}
