#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use super::*;
use memo_cache::MEMO_CACHE;
use memo_ir::print::print;
use memo_ir::{PrimitiveType, ScriptFunction};
use pretty_assertions::assert_eq;

const HIDDEN: &str = "__memo_context: __memo_context_type, __memo_id: __memo_id_type";

struct Fixture {
    tree: SyntaxTree,
    caches: CacheRegistry,
    ids: PositionalIdTracker,
}

impl Fixture {
    fn new(unit: &str) -> Self {
        Fixture {
            tree: SyntaxTree::new(),
            caches: CacheRegistry::new(),
            ids: PositionalIdTracker::new(unit),
        }
    }

    fn cx(&mut self) -> RewriteCx<'_> {
        RewriteCx::new(&mut self.tree, &mut self.caches, &mut self.ids)
    }

    fn print(&self, id: NodeId) -> String {
        print(&self.tree, id)
    }
}

fn function(
    tree: &mut SyntaxTree,
    name: Option<&str>,
    params: Vec<NodeId>,
    return_type: Option<NodeId>,
    statements: Vec<NodeId>,
) -> NodeId {
    let id = name.map(|name| tree.ident(name));
    let body = tree.block(statements);
    tree.alloc(NodeData::ScriptFunction(ScriptFunction {
        id,
        params,
        return_type,
        body: Some(body),
        ..ScriptFunction::default()
    }))
}

fn call_stmt(tree: &mut SyntaxTree, callee: &str, args: Vec<NodeId>) -> NodeId {
    let callee = tree.ident(callee);
    let call = tree.call(callee, args);
    tree.expr_stmt(call)
}

/// `() => void`, optionally annotated.
fn function_type(tree: &mut SyntaxTree, annotations: &[&str]) -> NodeId {
    tree.alloc(NodeData::FunctionType {
        params: vec![],
        return_type: None,
        has_receiver: false,
        annotations: annotations.iter().map(|anno| (*anno).to_string()).collect(),
    })
}

fn arrow(tree: &mut SyntaxTree, params: Vec<NodeId>, statements: Vec<NodeId>) -> NodeId {
    let function = function(tree, None, params, None, statements);
    tree.alloc(NodeData::ArrowFunction { function })
}

// ── Functions ───────────────────────────────────────────────────────

#[test]
fn void_function_rewrite() {
    let mut f = Fixture::new("rules::void_function_rewrite");
    let x = f.tree.ident("x");
    let stmt = call_stmt(&mut f.tree, "log", vec![x]);
    let number = f.tree.primitive(PrimitiveType::Number);
    let param = f.tree.param("x", Some(number));
    let func = function(&mut f.tree, Some("render"), vec![param], None, vec![stmt]);

    let out = rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    assert_eq!(out, func);
    assert_eq!(
        f.print(func),
        format!(
            "function render({HIDDEN}, x: number) {{\n\
             \x20   const __memo_scope = __memo_context.scope<undefined>(__memo_id + 0, 1);\n\
             \x20   const __memo_parameter_x = __memo_scope.param(0, x);\n\
             \x20   if (__memo_scope.unchanged) {{\n\
             \x20       __memo_scope.cached;\n\
             \x20       return;\n\
             \x20   }}\n\
             \x20   log(__memo_parameter_x.value);\n\
             \x20   {{\n\
             \x20       __memo_scope.recache();\n\
             \x20       return;\n\
             \x20   }}\n\
             }}"
        )
    );
}

#[test]
fn rewrite_is_idempotent() {
    let mut f = Fixture::new("rules::rewrite_is_idempotent");
    let read = f.tree.ident("a");
    let ret = f.tree.ret(Some(read));
    let number = f.tree.primitive(PrimitiveType::Number);
    let param = f.tree.param("a", Some(number));
    let ret_ty = f.tree.primitive(PrimitiveType::Number);
    let func = function(&mut f.tree, Some("id"), vec![param], Some(ret_ty), vec![ret]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();
    let once = f.print(func);
    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    assert_eq!(f.print(func), once);
    assert_eq!(f.ids.allocated(), 1);
}

#[test]
fn memo_entry_keeps_body() {
    let mut f = Fixture::new("rules::memo_entry_keeps_body");
    let stmt = call_stmt(&mut f.tree, "run", vec![]);
    let func = function(&mut f.tree, Some("entry"), vec![], None, vec![stmt]);
    let meta = NodeMetadata {
        has_memo_entry: Some(true),
        ..NodeMetadata::default()
    };

    rewrite_script_function(&mut f.cx(), func, Some(&meta), None).unwrap();
    let once = f.print(func);
    rewrite_script_function(&mut f.cx(), func, Some(&meta), None).unwrap();

    assert_eq!(once, format!("function entry({HIDDEN}) {{\n    run();\n}}"));
    assert_eq!(f.print(func), once);
    assert_eq!(f.ids.allocated(), 0);
}

#[test]
fn intrinsic_function_lowers_calls_without_scope() {
    let mut f = Fixture::new("rules::intrinsic_function");
    let callee = f.tree.ident(names::INTRINSIC_CONTEXT);
    let call = f.tree.call(callee, vec![]);
    let ret = f.tree.ret(Some(call));
    let func = function(&mut f.tree, Some("context"), vec![], None, vec![ret]);
    let meta = NodeMetadata {
        has_memo_intrinsic: Some(true),
        ..NodeMetadata::default()
    };

    rewrite_script_function(&mut f.cx(), func, Some(&meta), None).unwrap();

    assert_eq!(
        f.print(func),
        format!("function context({HIDDEN}) {{\n    return __memo_context;\n}}")
    );
}

#[test]
fn unmemoized_scope_leaves_body() {
    let mut f = Fixture::new("rules::unmemoized_scope_leaves_body");
    let inner = call_stmt(&mut f.tree, "run", vec![]);
    let escape = f.tree.alloc(NodeData::Block {
        statements: vec![inner],
        annotations: vec![names::ANNOTATION_MEMO_UNMEMOIZED.to_string()],
    });
    let func = function(&mut f.tree, Some("f"), vec![], None, vec![escape]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    assert_eq!(
        f.print(func),
        format!("function f({HIDDEN}) {{\n    @memo_unmemoized {{\n        run();\n    }}\n}}")
    );
    assert_eq!(f.ids.allocated(), 0);
}

#[test]
fn scope_follows_gensym_declarations() {
    let mut f = Fixture::new("rules::scope_follows_gensym_declarations");
    let param = f.tree.param("gensym%%_1", None);
    let binding = f.tree.ident("argA");
    let default = f.tree.ident("gensym%%_1");
    let declarator = f.tree.alloc(NodeData::VariableDeclarator {
        name: binding,
        type_annotation: None,
        init: Some(default),
    });
    let local = f.tree.alloc(NodeData::VariableDeclaration {
        kind: memo_ir::DeclarationKind::Let,
        declarators: vec![declarator],
    });
    let read = f.tree.ident("argA");
    let ret = f.tree.ret(Some(read));
    let number = f.tree.primitive(PrimitiveType::Number);
    let func = function(&mut f.tree, Some("f"), vec![param], Some(number), vec![local, ret]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    assert_eq!(
        f.print(func),
        format!(
            "function f({HIDDEN}, gensym%%_1): number {{\n\
             \x20   let argA = gensym%%_1;\n\
             \x20   const __memo_scope = __memo_context.scope<number>(__memo_id + 0, 1);\n\
             \x20   const __memo_parameter_argA = __memo_scope.param(0, argA);\n\
             \x20   if (__memo_scope.unchanged) return __memo_scope.cached;\n\
             \x20   return __memo_scope.recache(__memo_parameter_argA.value);\n\
             }}"
        )
    );
}

#[test]
fn memo_skip_params_are_not_bound() {
    let mut f = Fixture::new("rules::memo_skip_params_are_not_bound");
    let a = f.tree.param("a", None);
    let b_name = f.tree.ident("b");
    let b = f.tree.alloc(NodeData::Parameter {
        name: b_name,
        type_annotation: None,
        initializer: None,
        annotations: vec![names::ANNOTATION_MEMO_SKIP.to_string()],
    });
    let read_a = f.tree.ident("a");
    let read_b = f.tree.ident("b");
    let stmt = call_stmt(&mut f.tree, "use", vec![read_a, read_b]);
    let func = function(&mut f.tree, Some("f"), vec![a, b], None, vec![stmt]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    let printed = f.print(func);
    assert!(printed.contains("__memo_context.scope<undefined>(__memo_id + 0, 1);"));
    assert!(printed.contains("const __memo_parameter_a = __memo_scope.param(0, a);\n"));
    assert!(printed.contains("use(__memo_parameter_a.value, b);"));
}

#[test]
fn nested_functions_keep_their_returns_and_shadowing() {
    let mut f = Fixture::new("rules::nested_functions");
    let number = f.tree.primitive(PrimitiveType::Number);
    let param = f.tree.param("a", Some(number));

    let outer_read = f.tree.ident("a");
    let outer_ret = f.tree.ret(Some(outer_read));
    let capturing = arrow(&mut f.tree, vec![], vec![outer_ret]);
    let first = call_stmt(&mut f.tree, "run", vec![capturing]);

    let shadow = f.tree.param("a", None);
    let inner_read = f.tree.ident("a");
    let inner_ret = f.tree.ret(Some(inner_read));
    let shadowing = arrow(&mut f.tree, vec![shadow], vec![inner_ret]);
    let second = call_stmt(&mut f.tree, "run", vec![shadowing]);

    let func = function(&mut f.tree, Some("f"), vec![param], None, vec![first, second]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    assert_eq!(
        f.print(func),
        format!(
            "function f({HIDDEN}, a: number) {{\n\
             \x20   const __memo_scope = __memo_context.scope<undefined>(__memo_id + 0, 1);\n\
             \x20   const __memo_parameter_a = __memo_scope.param(0, a);\n\
             \x20   if (__memo_scope.unchanged) {{\n\
             \x20       __memo_scope.cached;\n\
             \x20       return;\n\
             \x20   }}\n\
             \x20   run(() => {{\n\
             \x20       return __memo_parameter_a.value;\n\
             \x20   }});\n\
             \x20   run((a) => {{\n\
             \x20       return a;\n\
             \x20   }});\n\
             \x20   {{\n\
             \x20       __memo_scope.recache();\n\
             \x20       return;\n\
             \x20   }}\n\
             }}"
        )
    );
}

#[test]
fn declared_functions_keep_body() {
    let mut f = Fixture::new("rules::declared_functions_keep_body");
    let stmt = call_stmt(&mut f.tree, "run", vec![]);
    let func = function(&mut f.tree, Some("ext"), vec![], None, vec![stmt]);
    let NodeData::ScriptFunction(mut data) = f.tree.data(func).clone() else {
        unreachable!()
    };
    data.is_declare = true;
    f.tree.set_data(func, NodeData::ScriptFunction(data));

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    assert_eq!(
        f.print(func),
        format!("declare function ext({HIDDEN}) {{\n    run();\n}}")
    );
}

// ── Methods ─────────────────────────────────────────────────────────

fn method(tree: &mut SyntaxTree, kind: MethodKind, name: &str, function: NodeId) -> NodeId {
    let name = tree.ident(name);
    tree.alloc(NodeData::MethodDefinition {
        kind,
        name,
        function,
        overloads: vec![],
    })
}

#[test]
fn getter_rewrites_return_type_only() {
    let mut f = Fixture::new("rules::getter");
    let cb = f.tree.ident("cb");
    let ret = f.tree.ret(Some(cb));
    let ty = function_type(&mut f.tree, &[]);
    let func = function(&mut f.tree, None, vec![], Some(ty), vec![ret]);
    let getter = method(&mut f.tree, MethodKind::Get, "value", func);

    let out = rewrite_method_definition(&mut f.cx(), getter, None).unwrap();

    assert_eq!(
        f.print(out),
        format!("get value(): ({HIDDEN}) => void {{\n    return cb;\n}}")
    );
    assert_eq!(f.ids.allocated(), 0);
}

#[test]
fn setter_rewrites_value_parameter_only() {
    let mut f = Fixture::new("rules::setter");
    let ty = function_type(&mut f.tree, &[]);
    let param = f.tree.param("v", Some(ty));
    let read = f.tree.ident("v");
    let stmt = call_stmt(&mut f.tree, "store", vec![read]);
    let func = function(&mut f.tree, None, vec![param], None, vec![stmt]);
    let setter = method(&mut f.tree, MethodKind::Set, "value", func);

    let out = rewrite_method_definition(&mut f.cx(), setter, None).unwrap();

    assert_eq!(
        f.print(out),
        format!("set value(v: ({HIDDEN}) => void) {{\n    store(v);\n}}")
    );
}

#[test]
fn method_overloads_are_rewritten() {
    let mut f = Fixture::new("rules::method_overloads");
    let void = f.tree.primitive(PrimitiveType::Void);
    let main = function(&mut f.tree, None, vec![], Some(void), vec![]);

    let number = f.tree.primitive(PrimitiveType::Number);
    let a = f.tree.param("a", Some(number));
    let overload_void = f.tree.primitive(PrimitiveType::Void);
    let signature = f.tree.alloc(NodeData::ScriptFunction(ScriptFunction {
        params: vec![a],
        return_type: Some(overload_void),
        ..ScriptFunction::default()
    }));
    let overload = method(&mut f.tree, MethodKind::Method, "foo", signature);
    let name = f.tree.ident("foo");
    let node = f.tree.alloc(NodeData::MethodDefinition {
        kind: MethodKind::Method,
        name,
        function: main,
        overloads: vec![overload],
    });

    let out = rewrite_method_definition(&mut f.cx(), node, None).unwrap();

    assert_eq!(
        f.print(out),
        format!(
            "foo({HIDDEN}): void {{\n\
             \x20   const __memo_scope = __memo_context.scope<undefined>(__memo_id + 0, 0);\n\
             \x20   if (__memo_scope.unchanged) {{\n\
             \x20       __memo_scope.cached;\n\
             \x20       return;\n\
             \x20   }}\n\
             \x20   {{\n\
             \x20       __memo_scope.recache();\n\
             \x20       return;\n\
             \x20   }}\n\
             }}\n\
             foo({HIDDEN}, a: number): void;"
        )
    );
}

#[test]
fn method_metadata_call_name_wins_over_method_name() {
    let mut f = Fixture::new("rules::method_call_name");
    let first = function(&mut f.tree, None, vec![], None, vec![]);
    let named = method(&mut f.tree, MethodKind::Method, "build", first);
    let second = function(&mut f.tree, None, vec![], None, vec![]);
    let renamed = method(&mut f.tree, MethodKind::Method, "other", second);
    let meta = NodeMetadata {
        call_name: Some("build".to_string()),
        ..NodeMetadata::default()
    };

    rewrite_method_definition(&mut f.cx(), named, None).unwrap();
    rewrite_method_definition(&mut f.cx(), renamed, Some(&meta)).unwrap();

    assert_eq!(f.ids.allocated(), 1);
}

// ── Calls, identifiers, returns ─────────────────────────────────────

#[test]
fn call_receives_hidden_arguments_after_receiver() {
    let mut f = Fixture::new("rules::call_receiver");
    let callee = f.tree.ident("apply");
    let receiver = f.tree.ident("self");
    let x = f.tree.ident("x");
    let call = f.tree.call(callee, vec![receiver, x]);
    let meta = NodeMetadata {
        call_name: Some("fallback".to_string()),
        has_receiver: Some(true),
        ..NodeMetadata::default()
    };

    let out = rewrite_call_expression(&mut f.cx(), call, Some(&meta)).unwrap();
    assert_eq!(f.print(out), "apply(self, __memo_context, __memo_id + 0, x)");

    let again = rewrite_call_expression(&mut f.cx(), out, Some(&meta)).unwrap();
    assert_eq!(again, out);
}

#[test]
fn member_call_receives_hidden_arguments_first() {
    let mut f = Fixture::new("rules::member_call");
    let object = f.tree.ident("obj");
    let property = f.tree.ident("apply");
    let callee = f.tree.member(object, property, memo_ir::MemberKind::PropertyAccess);
    let x = f.tree.ident("x");
    let call = f.tree.call(callee, vec![x]);
    let meta = NodeMetadata {
        has_receiver: Some(true),
        ..NodeMetadata::default()
    };

    let out = rewrite_call_expression(&mut f.cx(), call, Some(&meta)).unwrap();
    assert_eq!(f.print(out), "obj.apply(__memo_context, __memo_id + 0, x)");
}

#[test]
fn receiver_call_without_arguments_is_rejected() {
    let mut f = Fixture::new("rules::receiver_without_arguments");
    let callee = f.tree.ident("apply");
    let call = f.tree.call(callee, vec![]);
    let meta = NodeMetadata {
        has_receiver: Some(true),
        ..NodeMetadata::default()
    };

    let err = rewrite_call_expression(&mut f.cx(), call, Some(&meta)).unwrap_err();
    assert!(matches!(
        err,
        RewriteError::UnsupportedCallShape { node, .. } if node == call
    ));
}

#[test]
fn memo_entry_call_is_untouched() {
    let mut f = Fixture::new("rules::memo_entry_call");
    let callee = f.tree.ident("entry");
    let call = f.tree.call(callee, vec![]);
    let meta = NodeMetadata {
        has_memo_entry: Some(true),
        ..NodeMetadata::default()
    };

    let out = rewrite_call_expression(&mut f.cx(), call, Some(&meta)).unwrap();
    assert_eq!(out, call);
    assert_eq!(f.ids.allocated(), 0);
}

#[test]
fn identifiers_become_parameter_reads() {
    let mut f = Fixture::new("rules::identifiers");
    let plain = f.tree.ident("count");
    let generated = f.tree.ident("gensym___3");
    let runtime = f.tree.ident(names::SCOPE);

    let out = rewrite_identifier(&mut f.cx(), plain, None).unwrap();
    assert_eq!(f.print(out), "__memo_parameter_count.value");
    assert_eq!(rewrite_identifier(&mut f.cx(), generated, None).unwrap(), generated);
    assert_eq!(rewrite_identifier(&mut f.cx(), runtime, None).unwrap(), runtime);
}

#[test]
fn returns_become_recache() {
    let mut f = Fixture::new("rules::returns");
    let x = f.tree.ident("x");
    let value = f.tree.ret(Some(x));
    let bare = f.tree.ret(None);

    let out = rewrite_return_statement(&mut f.cx(), value, None).unwrap();
    assert_eq!(f.print(out), "return __memo_scope.recache(x);");
    assert_eq!(rewrite_return_statement(&mut f.cx(), out, None).unwrap(), out);

    let out = rewrite_return_statement(&mut f.cx(), bare, None).unwrap();
    assert_eq!(f.print(out), "{\n    __memo_scope.recache();\n    return;\n}");
}

#[test]
fn wrong_kind_is_a_precondition_error() {
    let mut f = Fixture::new("rules::wrong_kind");
    let ident = f.tree.ident("x");

    let err = rewrite_union_type(&mut f.cx(), ident, None).unwrap_err();
    assert!(matches!(
        err,
        RewriteError::UnexpectedKind {
            expected: NodeKind::UnionType,
            found: NodeKind::Identifier,
            ..
        }
    ));
}

// ── Types ───────────────────────────────────────────────────────────

#[test]
fn union_rewrites_function_members() {
    let mut f = Fixture::new("rules::union");
    let func = function_type(&mut f.tree, &[names::ANNOTATION_MEMO]);
    let undefined = f.tree.alloc(NodeData::Undefined);
    let union = f.tree.alloc(NodeData::UnionType {
        types: vec![func, undefined],
    });

    let out = rewrite_union_type(&mut f.cx(), union, None).unwrap();

    assert_eq!(
        f.print(out),
        format!("(@memo ({HIDDEN}) => void) | undefined")
    );
    assert_eq!(f.tree.original(out), Some(union));
}

#[test]
fn forbidden_function_type_is_kept_unless_memo_in_type_params() {
    let mut f = Fixture::new("rules::forbidden_function_type");
    let plain = function_type(&mut f.tree, &[]);
    let memo = function_type(&mut f.tree, &[names::ANNOTATION_MEMO]);
    let forbid = NodeMetadata {
        forbid_type_rewrite: Some(true),
        ..NodeMetadata::default()
    };
    let forbid_in_params = NodeMetadata {
        is_within_type_params: Some(true),
        ..forbid.clone()
    };

    assert_eq!(
        rewrite_function_type(&mut f.cx(), plain, Some(&forbid)).unwrap(),
        plain
    );
    assert_eq!(
        rewrite_function_type(&mut f.cx(), plain, Some(&forbid_in_params)).unwrap(),
        plain
    );
    let out = rewrite_function_type(&mut f.cx(), memo, Some(&forbid_in_params)).unwrap();
    assert_eq!(f.print(out), format!("@memo ({HIDDEN}) => void"));
}

#[test]
fn function_type_keeps_receiver_first() {
    let mut f = Fixture::new("rules::function_type_receiver");
    let this_ty = f.tree.type_ref("Widget");
    let this = f.tree.param("this", Some(this_ty));
    let ty = f.tree.alloc(NodeData::FunctionType {
        params: vec![this],
        return_type: None,
        has_receiver: true,
        annotations: vec![],
    });

    let out = rewrite_function_type(&mut f.cx(), ty, None).unwrap();
    assert_eq!(f.print(out), format!("(this: Widget, {HIDDEN}) => void"));
    assert_eq!(rewrite_function_type(&mut f.cx(), out, None).unwrap(), out);
}

#[test]
fn type_reference_rewrites_arguments_only_in_type_params() {
    let mut f = Fixture::new("rules::type_reference");
    let arg = function_type(&mut f.tree, &[]);
    let reference = f.tree.alloc(NodeData::TypeReference {
        name: "Array".to_string(),
        type_args: vec![arg],
    });
    let within = NodeMetadata {
        is_within_type_params: Some(true),
        ..NodeMetadata::default()
    };

    assert_eq!(
        rewrite_type_reference(&mut f.cx(), reference, None).unwrap(),
        reference
    );
    let out = rewrite_type_reference(&mut f.cx(), reference, Some(&within)).unwrap();
    assert_eq!(f.print(out), format!("Array<({HIDDEN}) => void>"));
}

#[test]
fn type_alias_rewrites_aliased_function_type() {
    let mut f = Fixture::new("rules::type_alias");
    let ty = function_type(&mut f.tree, &[]);
    let name = f.tree.ident("Builder");
    let alias = f.tree.alloc(NodeData::TypeAlias {
        name,
        type_annotation: Some(ty),
        annotations: vec![names::ANNOTATION_MEMO.to_string()],
    });
    let forbid = NodeMetadata {
        forbid_type_rewrite: Some(true),
        ..NodeMetadata::default()
    };

    let out = rewrite_type_alias(&mut f.cx(), alias, Some(&forbid)).unwrap();
    assert_eq!(
        f.print(out),
        format!("@memo type Builder = ({HIDDEN}) => void;")
    );
}

#[test]
fn parameter_type_is_rewritten_in_place() {
    let mut f = Fixture::new("rules::parameter");
    let ty = function_type(&mut f.tree, &[]);
    let param = f.tree.param("content", Some(ty));
    let untyped = f.tree.param("other", None);

    assert_eq!(rewrite_parameter(&mut f.cx(), param, None).unwrap(), param);
    assert_eq!(f.print(param), format!("content: ({HIDDEN}) => void"));
    assert_eq!(rewrite_parameter(&mut f.cx(), untyped, None).unwrap(), untyped);
    assert_eq!(f.print(untyped), "other");
}

// ── Declarations with function values ───────────────────────────────

#[test]
fn declarator_arrow_takes_return_type_from_annotation() {
    let mut f = Fixture::new("rules::declarator");
    let number = f.tree.primitive(PrimitiveType::Number);
    let annotation = f.tree.alloc(NodeData::FunctionType {
        params: vec![],
        return_type: Some(number),
        has_receiver: false,
        annotations: vec![],
    });
    let one = f.tree.number(1);
    let ret = f.tree.ret(Some(one));
    let init = arrow(&mut f.tree, vec![], vec![ret]);
    let name = f.tree.ident("f");
    let declarator = f.tree.alloc(NodeData::VariableDeclarator {
        name,
        type_annotation: Some(annotation),
        init: Some(init),
    });

    let out = rewrite_variable_declarator(&mut f.cx(), declarator, None).unwrap();

    assert_eq!(
        f.print(out),
        format!(
            "f: ({HIDDEN}) => number = ({HIDDEN}) => {{\n\
             \x20   const __memo_scope = __memo_context.scope<number>(__memo_id + 0, 0);\n\
             \x20   if (__memo_scope.unchanged) return __memo_scope.cached;\n\
             \x20   return __memo_scope.recache(1);\n\
             }}"
        )
    );
}

#[test]
fn declarator_conditional_rewrites_alternate_only() {
    let mut f = Fixture::new("rules::declarator_conditional");
    let test = f.tree.ident("flag");
    let consequent = f.tree.alloc(NodeData::Undefined);
    let body = call_stmt(&mut f.tree, "run", vec![]);
    let alternate = arrow(&mut f.tree, vec![], vec![body]);
    let conditional = f.tree.alloc(NodeData::Conditional {
        test,
        consequent,
        alternate,
    });
    let name = f.tree.ident("f");
    let declarator = f.tree.alloc(NodeData::VariableDeclarator {
        name,
        type_annotation: None,
        init: Some(conditional),
    });

    let out = rewrite_variable_declarator(&mut f.cx(), declarator, None).unwrap();

    let printed = f.print(out);
    assert!(printed.starts_with(&format!("f = flag ? undefined : ({HIDDEN}) => {{\n")));
    assert!(printed.contains("__memo_context.scope<undefined>(__memo_id + 0, 0);"));
}

#[test]
fn property_with_asserted_arrow_is_rewritten() {
    let mut f = Fixture::new("rules::property");
    let body = call_stmt(&mut f.tree, "run", vec![]);
    let value = arrow(&mut f.tree, vec![], vec![body]);
    let ty = function_type(&mut f.tree, &[]);
    let asserted = f.tree.alloc(NodeData::As {
        expression: value,
        type_annotation: ty,
        is_const: false,
    });
    let key = f.tree.ident("content");
    let property = f.tree.alloc(NodeData::Property {
        key,
        value: Some(asserted),
    });

    let out = rewrite_property(&mut f.cx(), property, None).unwrap();

    let printed = f.print(out);
    assert!(printed.starts_with(&format!("content: ({HIDDEN}) => {{\n")));
    assert!(printed.ends_with(&format!("}} as ({HIDDEN}) => void")));
}

#[test]
fn property_without_function_value_is_untouched() {
    let mut f = Fixture::new("rules::property_plain");
    let key = f.tree.ident("count");
    let value = f.tree.number(3);
    let property = f.tree.alloc(NodeData::Property {
        key,
        value: Some(value),
    });

    assert_eq!(rewrite_property(&mut f.cx(), property, None).unwrap(), property);
}

#[test]
fn class_property_rewrites_type_and_arrow_value() {
    let mut f = Fixture::new("rules::class_property");
    let ty = function_type(&mut f.tree, &[]);
    let body = call_stmt(&mut f.tree, "run", vec![]);
    let value = arrow(&mut f.tree, vec![], vec![body]);
    let key = f.tree.ident("builder");
    let property = f.tree.alloc(NodeData::ClassProperty {
        key,
        type_annotation: Some(ty),
        value: Some(value),
        annotations: vec![],
    });

    let out = rewrite_class_property(&mut f.cx(), property, None).unwrap();

    let printed = f.print(out);
    assert!(printed.starts_with(&format!(
        "builder: ({HIDDEN}) => void = ({HIDDEN}) => {{\n"
    )));
    assert!(printed.ends_with("};"));
}

// ── Scoping ─────────────────────────────────────────────────────────

fn const_decl(tree: &mut SyntaxTree, name: &str, value: i64) -> NodeId {
    let binding = tree.ident(name);
    let init = tree.number(value);
    let declarator = tree.alloc(NodeData::VariableDeclarator {
        name: binding,
        type_annotation: None,
        init: Some(init),
    });
    tree.alloc(NodeData::VariableDeclaration {
        kind: memo_ir::DeclarationKind::Const,
        declarators: vec![declarator],
    })
}

#[test]
fn block_local_shadows_parameter_in_return() {
    let mut f = Fixture::new("rules::block_local_shadows_parameter_in_return");
    let number = f.tree.primitive(PrimitiveType::Number);
    let param = f.tree.param("a", Some(number));
    let local = const_decl(&mut f.tree, "a", 1);
    let read = f.tree.ident("a");
    let ret = f.tree.ret(Some(read));
    let block = f.tree.block(vec![local, ret]);
    let ret_ty = f.tree.primitive(PrimitiveType::Number);
    let func = function(&mut f.tree, Some("g"), vec![param], Some(ret_ty), vec![block]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    let printed = f.print(func);
    assert!(printed.contains("const __memo_parameter_a = __memo_scope.param(0, a);"));
    assert!(printed.contains("const a = 1;"));
    assert!(printed.contains("return __memo_scope.recache(a);"));
    assert!(!printed.contains("recache(__memo_parameter_a.value)"));
}

#[test]
fn block_local_shadowing_ends_with_the_block() {
    let mut f = Fixture::new("rules::block_local_shadowing_ends_with_the_block");
    let param = f.tree.param("a", None);
    let read_before = f.tree.ident("a");
    let before = call_stmt(&mut f.tree, "early", vec![read_before]);
    let local = const_decl(&mut f.tree, "a", 1);
    let read_inner = f.tree.ident("a");
    let inner = call_stmt(&mut f.tree, "inner", vec![read_inner]);
    let block = f.tree.block(vec![before, local, inner]);
    let read_after = f.tree.ident("a");
    let after = call_stmt(&mut f.tree, "after", vec![read_after]);
    let func = function(&mut f.tree, Some("g"), vec![param], None, vec![block, after]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    // A block-scoped binding covers reads before its declaration too.
    assert_eq!(f.print(before), "early(a);");
    assert_eq!(f.print(inner), "inner(a);");
    assert_eq!(f.print(after), "after(__memo_parameter_a.value);");
}

#[test]
fn memo_skip_from_metadata_is_not_bound() {
    let mut f = Fixture::new("rules::memo_skip_from_metadata_is_not_bound");
    let a = f.tree.param("a", None);
    let b = f.tree.param("b", None);
    let read_a = f.tree.ident("a");
    let read_b = f.tree.ident("b");
    let stmt = call_stmt(&mut f.tree, "use", vec![read_a, read_b]);
    let func = function(&mut f.tree, Some("f"), vec![a, b], None, vec![stmt]);
    f.caches.get_cache(MEMO_CACHE).collect(
        &f.tree,
        b,
        Some(NodeMetadata {
            has_memo_skip: Some(true),
            ..NodeMetadata::default()
        }),
    );
    f.caches.set_active(Some(MEMO_CACHE));

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    let printed = f.print(func);
    assert!(printed.contains("__memo_context.scope<undefined>(__memo_id + 0, 1);"));
    assert!(printed.contains("const __memo_parameter_a = __memo_scope.param(0, a);\n"));
    assert!(printed.contains("use(__memo_parameter_a.value, b);"));
}

#[test]
fn gensym_param_without_declaration_is_still_memoized() {
    let mut f = Fixture::new("rules::gensym_param_without_declaration");
    let param = f.tree.param("gensym%%_1", None);
    let read = f.tree.ident("gensym%%_1");
    let stmt = call_stmt(&mut f.tree, "use", vec![read]);
    let func = function(&mut f.tree, Some("f"), vec![param], None, vec![stmt]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    let printed = f.print(func);
    assert!(printed.contains("__memo_context.scope<undefined>(__memo_id + 0, 1);"));
    assert!(printed.contains("__memo_scope.param(0, gensym%%_1);"));
    assert_eq!(f.print(stmt), "use(__memo_parameter_gensym%%_1.value);");
}

#[test]
fn deeply_nested_reads_are_rewritten() {
    let mut f = Fixture::new("rules::deeply_nested_reads_are_rewritten");
    let param = f.tree.param("a", None);
    let read = f.tree.ident("a");
    let stmt = call_stmt(&mut f.tree, "use", vec![read]);
    let mut nested = f.tree.block(vec![stmt]);
    for _ in 0..100_000 {
        nested = f.tree.block(vec![nested]);
    }
    let func = function(&mut f.tree, Some("f"), vec![param], None, vec![nested]);

    rewrite_script_function(&mut f.cx(), func, None, None).unwrap();

    assert_eq!(f.print(stmt), "use(__memo_parameter_a.value);");
}
