//! Memo Rewrite - Memoization Transform
//!
//! Rewrites functions marked for memoization so that a call with unchanged
//! inputs returns its cached result instead of re-running the body.
//!
//! # Architecture
//!
//! - `names`: runtime identifiers the rewritten code refers to
//! - `factory`: builders for the synthetic nodes (scope, guard, recache, ...)
//! - `analysis`: read-only questions about functions and bodies
//! - `rules`: one rewrite rule per node kind, plus the function and method
//!   entry points
//! - `dispatch`: the node-kind to rule table
//! - `internals`: intrinsic call lowering for `@memo_intrinsic` functions
//! - `pass`: the cache-driven tree walk that applies the table
//!
//! # Rewritten Shape
//!
//! ```text
//! function f(__memo_context: __memo_context_type, __memo_id: __memo_id_type, a: number): number {
//!     const __memo_scope = __memo_context.scope<number>(__memo_id + 0, 1);
//!     const __memo_parameter_a = __memo_scope.param(0, a);
//!     if (__memo_scope.unchanged) return __memo_scope.cached;
//!     return __memo_scope.recache(__memo_parameter_a.value);
//! }
//! ```

mod analysis;
mod config;
pub mod dispatch;
mod error;
pub mod factory;
mod internals;
pub mod names;
mod pass;
pub mod rules;

pub use config::MemoPassConfig;
pub use dispatch::{rewrite_by_kind, RewriteFn};
pub use error::RewriteError;
pub use internals::transform_internals;
pub use pass::MemoPass;
pub use rules::{rewrite_method_definition, rewrite_script_function, RewriteCx};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once; only
/// the first call has an effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
