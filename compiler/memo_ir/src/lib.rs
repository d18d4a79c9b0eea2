//! Memo IR - Syntax Tree Host
//!
//! This crate contains the tree-facing half of the memo rewrite engine:
//! - `NodeId` identities for tree nodes
//! - `NodeKind` type tags recorded in annotation caches
//! - The `TreeHost` capability (parent/children/kind/original lookups)
//! - The `MutationObserver` hooks a host calls on clone and in-place update
//! - `SyntaxTree`, an arena-backed host used by the rewrite passes and tests
//! - `ensure_sufficient_stack` for the recursive walks over deep trees
//!
//! # Design Philosophy
//!
//! - **Identity, not references**: nodes are addressed by `NodeId(u32)`; the
//!   engine never holds borrowed nodes across a mutation.
//! - **Explicit hooks**: a host notifies its observer after every structural
//!   clone and every update. Nothing is intercepted behind the host's back.
//! - **Isomorphic clones**: `clone_subtree` preserves child count and order at
//!   every level, which is what the mirror walk relies on.

mod host;
mod kind;
mod node_id;
pub mod print;
mod stack;
pub mod tree;

pub use host::{MutationObserver, TreeHost};
pub use kind::NodeKind;
pub use node_id::NodeId;
pub use stack::ensure_sufficient_stack;
pub use tree::{
    BinaryOp, DeclarationKind, MemberKind, MethodKind, NodeData, PrimitiveType, ScriptFunction,
    SyntaxTree,
};
