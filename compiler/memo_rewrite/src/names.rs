//! Runtime names referenced by rewritten code.

/// Hidden context parameter and argument.
pub const CONTEXT: &str = "__memo_context";
pub const CONTEXT_TYPE: &str = "__memo_context_type";

/// Hidden positional id parameter and argument base.
pub const ID: &str = "__memo_id";
pub const ID_TYPE: &str = "__memo_id_type";

/// Local holding the scope handle.
pub const SCOPE: &str = "__memo_scope";

/// Members of the context and the scope handle.
pub const INTERNAL_SCOPE: &str = "scope";
pub const INTERNAL_VALUE_OK: &str = "unchanged";
pub const INTERNAL_VALUE: &str = "cached";
pub const INTERNAL_VALUE_NEW: &str = "recache";
pub const INTERNAL_PARAMETER_STATE: &str = "param";
pub const COMPUTE: &str = "compute";

/// Prefix of parameter-binding locals; the parameter name follows an `_`.
pub const PARAMETER: &str = "__memo_parameter";
/// Member read through a parameter binding.
pub const VALUE: &str = "value";

/// Compiler-generated names. Never rewritten into parameter accesses.
pub const GENSYM_INTRINSIC: &str = "gensym%%_";
pub const GENSYM_UI: &str = "gensym___";

/// Intrinsic calls lowered inside `@memo_intrinsic` functions.
pub const INTRINSIC_CONTEXT: &str = "__context";
pub const INTRINSIC_ID: &str = "__id";

pub const ANNOTATION_MEMO: &str = "memo";
pub const ANNOTATION_MEMO_SKIP: &str = "memo_skip";
pub const ANNOTATION_MEMO_INTRINSIC: &str = "memo_intrinsic";
pub const ANNOTATION_MEMO_ENTRY: &str = "memo_entry";
pub const ANNOTATION_MEMO_UNMEMOIZED: &str = "memo_unmemoized";

/// Name of the binding local for parameter `name`.
pub fn memo_parameter(name: &str) -> String {
    format!("{PARAMETER}_{name}")
}

/// Whether `name` was produced by lowering and must be left alone.
pub fn is_gensym(name: &str) -> bool {
    name.starts_with(GENSYM_INTRINSIC) || name.starts_with(GENSYM_UI)
}

/// Whether `name` belongs to the memo runtime (hidden params, scope, bindings).
pub fn is_memo_runtime(name: &str) -> bool {
    name.starts_with("__memo_")
}
