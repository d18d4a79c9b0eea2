//! Source-like rendering of syntax trees.
//!
//! Used by cache diagnostics and by tests that compare rewritten trees as
//! text. The output is stable but not meant to round-trip through a parser.

use crate::tree::{MethodKind, NodeData, ScriptFunction, SyntaxTree};
use crate::{ensure_sufficient_stack, NodeId};

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 4;

/// Render the subtree rooted at `id`.
pub fn print(tree: &SyntaxTree, id: NodeId) -> String {
    let mut printer = Printer {
        tree,
        out: String::new(),
        indent: 0,
    };
    printer.node(id);
    printer.out
}

struct Printer<'a> {
    tree: &'a SyntaxTree,
    out: String,
    indent: usize,
}

impl Printer<'_> {
    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent * INDENT_WIDTH {
            self.out.push(' ');
        }
    }

    fn list(&mut self, ids: &[NodeId], sep: &str) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            self.node(*id);
        }
    }

    fn annotations(&mut self, annotations: &[String]) {
        for anno in annotations {
            self.push("@");
            self.push(anno);
            self.push(" ");
        }
    }

    fn type_suffix(&mut self, ty: Option<NodeId>) {
        if let Some(ty) = ty {
            self.push(": ");
            self.node(ty);
        }
    }

    fn braced(&mut self, items: &[NodeId]) {
        if items.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{");
        self.indent += 1;
        for item in items {
            self.newline();
            self.node(*item);
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    fn function(&mut self, func: &ScriptFunction, arrow: bool) {
        self.push("(");
        self.list(&func.params, ", ");
        self.push(")");
        self.type_suffix(func.return_type);
        if arrow {
            self.push(" =>");
        }
        match func.body {
            Some(body) => {
                self.push(" ");
                self.node(body);
            }
            None if !arrow => self.push(";"),
            None => {}
        }
    }

    fn node(&mut self, id: NodeId) {
        ensure_sufficient_stack(|| self.node_inner(id));
    }

    fn node_inner(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.data(id) {
            NodeData::Program { statements } => {
                for (i, stmt) in statements.iter().enumerate() {
                    if i > 0 {
                        self.newline();
                    }
                    self.node(*stmt);
                }
            }
            NodeData::ClassDeclaration { name, members } => {
                self.push("class ");
                self.push(name);
                self.push(" ");
                self.braced(members);
            }
            NodeData::MethodDefinition {
                kind,
                name,
                function,
                overloads,
            } => {
                let func = tree.script_function(*function);
                if let Some(func) = func {
                    self.annotations(&func.annotations);
                }
                match kind {
                    MethodKind::Get => self.push("get "),
                    MethodKind::Set => self.push("set "),
                    MethodKind::Method | MethodKind::Constructor => {}
                }
                self.node(*name);
                if let Some(func) = func {
                    self.function(func, false);
                }
                for overload in overloads {
                    self.newline();
                    self.node(*overload);
                }
            }
            NodeData::ScriptFunction(func) => {
                self.annotations(&func.annotations);
                if func.is_declare {
                    self.push("declare ");
                }
                self.push("function");
                if let Some(name) = func.id {
                    self.push(" ");
                    self.node(name);
                }
                self.function(func, false);
            }
            NodeData::ArrowFunction { function } => {
                if let Some(func) = tree.script_function(*function) {
                    self.annotations(&func.annotations);
                    self.function(func, true);
                }
            }
            NodeData::Parameter {
                name,
                type_annotation,
                initializer,
                annotations,
            } => {
                self.annotations(annotations);
                self.node(*name);
                self.type_suffix(*type_annotation);
                if let Some(init) = initializer {
                    self.push(" = ");
                    self.node(*init);
                }
            }
            NodeData::Identifier { name } => self.push(name),
            NodeData::Block {
                statements,
                annotations,
            } => {
                self.annotations(annotations);
                self.braced(statements);
            }
            NodeData::VariableDeclaration { kind, declarators } => {
                self.push(match kind {
                    crate::DeclarationKind::Const => "const ",
                    crate::DeclarationKind::Let => "let ",
                });
                self.list(declarators, ", ");
                self.push(";");
            }
            NodeData::VariableDeclarator {
                name,
                type_annotation,
                init,
            } => {
                self.node(*name);
                self.type_suffix(*type_annotation);
                if let Some(init) = init {
                    self.push(" = ");
                    self.node(*init);
                }
            }
            NodeData::Return { argument } => match argument {
                Some(arg) => {
                    self.push("return ");
                    self.node(*arg);
                    self.push(";");
                }
                None => self.push("return;"),
            },
            NodeData::ExpressionStatement { expression } => {
                self.node(*expression);
                self.push(";");
            }
            NodeData::If {
                test,
                consequent,
                alternate,
            } => {
                self.push("if (");
                self.node(*test);
                self.push(") ");
                self.node(*consequent);
                if let Some(alt) = alternate {
                    self.push(" else ");
                    self.node(*alt);
                }
            }
            NodeData::Throw { argument } => {
                self.push("throw ");
                self.node(*argument);
                self.push(";");
            }
            NodeData::Call {
                callee,
                type_args,
                args,
            } => {
                self.node(*callee);
                if !type_args.is_empty() {
                    self.push("<");
                    self.list(type_args, ", ");
                    self.push(">");
                }
                self.push("(");
                self.list(args, ", ");
                self.push(")");
            }
            NodeData::Member {
                object, property, ..
            } => {
                self.node(*object);
                self.push(".");
                self.node(*property);
            }
            NodeData::Binary { op, left, right } => {
                self.node(*left);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.node(*right);
            }
            NodeData::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.node(*test);
                self.push(" ? ");
                self.node(*consequent);
                self.push(" : ");
                self.node(*alternate);
            }
            NodeData::NumberLiteral { value } => self.push(&value.to_string()),
            NodeData::StringLiteral { value } => {
                self.push("\"");
                self.push(value);
                self.push("\"");
            }
            NodeData::This => self.push("this"),
            NodeData::Object { properties } => {
                self.push("{");
                self.list(properties, ", ");
                self.push("}");
            }
            NodeData::Property { key, value } => {
                self.node(*key);
                if let Some(value) = value {
                    self.push(": ");
                    self.node(*value);
                }
            }
            NodeData::ClassProperty {
                key,
                type_annotation,
                value,
                annotations,
            } => {
                self.annotations(annotations);
                self.node(*key);
                self.type_suffix(*type_annotation);
                if let Some(value) = value {
                    self.push(" = ");
                    self.node(*value);
                }
                self.push(";");
            }
            NodeData::TypeAlias {
                name,
                type_annotation,
                annotations,
            } => {
                self.annotations(annotations);
                self.push("type ");
                self.node(*name);
                if let Some(ty) = type_annotation {
                    self.push(" = ");
                    self.node(*ty);
                }
                self.push(";");
            }
            NodeData::As {
                expression,
                type_annotation,
                ..
            } => {
                self.node(*expression);
                self.push(" as ");
                self.node(*type_annotation);
            }
            NodeData::UnionType { types } => {
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        self.push(" | ");
                    }
                    let wrap = matches!(tree.data(*ty), NodeData::FunctionType { .. });
                    if wrap {
                        self.push("(");
                    }
                    self.node(*ty);
                    if wrap {
                        self.push(")");
                    }
                }
            }
            NodeData::FunctionType {
                params,
                return_type,
                annotations,
                ..
            } => {
                self.annotations(annotations);
                self.push("(");
                self.list(params, ", ");
                self.push(") => ");
                match return_type {
                    Some(ret) => self.node(*ret),
                    None => self.push("void"),
                }
            }
            NodeData::TypeReference { name, type_args } => {
                self.push(name);
                if !type_args.is_empty() {
                    self.push("<");
                    self.list(type_args, ", ");
                    self.push(">");
                }
            }
            NodeData::Primitive(ty) => self.push(ty.as_str()),
            NodeData::Undefined => self.push("undefined"),
        }
    }
}
