//! Rill runtime - the execution core of the Rill scripting language.
//!
//! An external parser produces `rill_ir` trees; this crate compiles them
//! into AVMC instruction queues and executes the queues against a scope
//! stack, consuming and producing references on an explicit evaluation
//! stack.
//!
//! # Architecture
//!
//! - `value`: the nine-kind dynamically-typed value, typed alternative
//!   access, three-way comparison, truthiness and diagnostic dumping
//! - `variable` / `global`: reference-counted variable cells, the tracker
//!   the garbage collector walks, and the global context that owns it
//! - `reference`: the lvalue/rvalue abstraction - a root (constant,
//!   temporary or variable) plus a chain of navigation modifiers
//! - `avmc`: the append-only instruction queue of executor nodes
//! - `status`: the control-flow status threaded through block execution
//! - `context` / `stack`: the executive scope stack and reference stack
//! - `lower`: statement/expression compilation into queues
//! - `function`: functions instantiated over a solidified body queue
//! - `error`: the runtime error taxonomy and backtrace frames

mod avmc;
mod context;
mod error;
mod function;
mod global;
mod reference;
mod stack;
mod status;
mod value;
mod variable;

pub mod lower;

pub use avmc::{AvmcQueue, ExecResult, Executor, Operand, Uparam};
pub use context::{Executive, ScopedExecutive};
pub use error::{BacktraceFrame, ErrorKind, LowerError, RuntimeError};
pub use function::InstantiatedFunction;
pub use global::GlobalContext;
pub use reference::{Modifier, Reference, Root};
pub use stack::ReferenceStack;
pub use status::Status;
pub use value::{compare_values, Callable, Compare, OpaqueObject, Value, Varray, Vobject, Vtype};
pub use variable::{VarCell, VariableCallback, VariableTracker};
