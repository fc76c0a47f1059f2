//! Rill IR - syntax trees consumed by the Rill runtime.
//!
//! The parser (not part of this workspace) produces `Stmt`/`Expr` trees;
//! `rill_runtime::lower` compiles them into AVMC instruction queues.
//!
//! This crate is deliberately small and dependency-free: it holds only the
//! source-location type shared by diagnostics and backtraces, and the
//! statement/expression node kinds.

mod ast;
mod location;

pub use ast::{
    BinaryOp, BreakTarget, ContinueTarget, Expr, ExprKind, Literal, Stmt, StmtKind, SwitchClause,
    UnaryOp,
};
pub use location::SourceLocation;
