//! The flattened instruction queue.
//!
//! Lowering turns the statement tree into a flat queue of nodes; each node
//! carries an executor function pointer, a small scratch parameter, an
//! optional source location for backtraces, and a boxed slice of encoded
//! operands (which may include nested queues for branches and loop
//! bodies). Execution walks the nodes in order until one yields a
//! non-`Next` status or fails; failures pick up a backtrace frame from
//! every located node they unwind through.

use std::fmt;
use std::rc::Rc;

use rill_ir::SourceLocation;

use crate::context::Executive;
use crate::error::RuntimeError;
use crate::status::Status;
use crate::value::Value;
use crate::variable::VariableCallback;

/// Scratch parameter packed into every node. Executors that need more
/// than these few bits use operands instead.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Uparam {
    pub x16: u16,
    pub x32: u32,
}

impl Uparam {
    pub fn none() -> Self {
        Uparam::default()
    }

    pub fn with_x16(x16: u16) -> Self {
        Uparam { x16, x32: 0 }
    }

    pub fn with_x32(x32: u32) -> Self {
        Uparam { x16: 0, x32 }
    }
}

/// One encoded operand of a queue node.
///
/// The catalogue is closed: every executor knows the exact shapes it was
/// lowered with, so the accessors panic on a mismatch rather than
/// propagate an error that could only arise from a lowering bug.
pub enum Operand {
    Int(i64),
    Name(Rc<str>),
    Names(Box<[Rc<str>]>),
    Value(Value),
    Location(SourceLocation),
    Queue(AvmcQueue),
}

impl Operand {
    #[track_caller]
    pub fn as_int(&self) -> i64 {
        match self {
            Operand::Int(i) => *i,
            other => panic!("operand mismatch: expected integer, got {other:?}"),
        }
    }

    #[track_caller]
    pub fn as_name(&self) -> &Rc<str> {
        match self {
            Operand::Name(name) => name,
            other => panic!("operand mismatch: expected name, got {other:?}"),
        }
    }

    #[track_caller]
    pub fn as_names(&self) -> &[Rc<str>] {
        match self {
            Operand::Names(names) => names,
            other => panic!("operand mismatch: expected name list, got {other:?}"),
        }
    }

    #[track_caller]
    pub fn as_value(&self) -> &Value {
        match self {
            Operand::Value(value) => value,
            other => panic!("operand mismatch: expected value, got {other:?}"),
        }
    }

    #[track_caller]
    pub fn as_location(&self) -> &SourceLocation {
        match self {
            Operand::Location(sloc) => sloc,
            other => panic!("operand mismatch: expected location, got {other:?}"),
        }
    }

    #[track_caller]
    pub fn as_queue(&self) -> &AvmcQueue {
        match self {
            Operand::Queue(queue) => queue,
            other => panic!("operand mismatch: expected queue, got {other:?}"),
        }
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(i) => write!(f, "Int({i})"),
            Operand::Name(name) => write!(f, "Name({name:?})"),
            Operand::Names(names) => write!(f, "Names({names:?})"),
            Operand::Value(value) => write!(f, "Value({value:?})"),
            Operand::Location(sloc) => write!(f, "Location({sloc})"),
            Operand::Queue(queue) => write!(f, "Queue(len={})", queue.len()),
        }
    }
}

/// The outcome of one executor: a control-flow status, or a failure.
pub type ExecResult = Result<Status, RuntimeError>;

/// A node executor. Receives the context, the node's scratch parameter
/// and its operands.
pub type Executor = fn(&mut Executive<'_>, Uparam, &[Operand]) -> ExecResult;

struct Node {
    exec: Executor,
    uparam: Uparam,
    symbols: Option<SourceLocation>,
    args: Box<[Operand]>,
}

/// A flat, append-only queue of executable nodes. Queues move; they are
/// shared (inside function values) behind `Rc`, never cloned node by
/// node.
#[derive(Default)]
pub struct AvmcQueue {
    nodes: Vec<Node>,
}

const MAX_NODES: usize = u32::MAX as usize;

#[cold]
#[inline(never)]
fn queue_full() -> ! {
    panic!("instruction queue length limit exceeded");
}

impl AvmcQueue {
    pub fn new() -> Self {
        AvmcQueue::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Release spare capacity once lowering has finished appending.
    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Append a node with no operands and no location.
    pub fn append(&mut self, exec: Executor, uparam: Uparam) -> &mut Self {
        self.append_node(exec, uparam, None, Box::new([]))
    }

    /// Append a node with operands but no location.
    pub fn append_args(
        &mut self,
        exec: Executor,
        uparam: Uparam,
        args: Vec<Operand>,
    ) -> &mut Self {
        self.append_node(exec, uparam, None, args.into_boxed_slice())
    }

    /// Append a node that contributes a backtrace frame on unwind.
    pub fn append_traced(
        &mut self,
        exec: Executor,
        uparam: Uparam,
        symbols: SourceLocation,
        args: Vec<Operand>,
    ) -> &mut Self {
        self.append_node(exec, uparam, Some(symbols), args.into_boxed_slice())
    }

    fn append_node(
        &mut self,
        exec: Executor,
        uparam: Uparam,
        symbols: Option<SourceLocation>,
        args: Box<[Operand]>,
    ) -> &mut Self {
        if self.nodes.len() >= MAX_NODES {
            queue_full();
        }
        self.nodes.push(Node {
            exec,
            uparam,
            symbols,
            args,
        });
        self
    }

    /// Execute every node in order. Stops at the first non-`Next` status
    /// and propagates it; on failure, annotates the error with a frame
    /// for each located node being unwound through.
    pub fn execute(&self, ctx: &mut Executive<'_>) -> ExecResult {
        for node in &self.nodes {
            match (node.exec)(ctx, node.uparam, &node.args) {
                Ok(Status::Next) => {}
                Ok(status) => return Ok(status),
                Err(mut err) => {
                    if let Some(sloc) = &node.symbols {
                        err.push_frame(sloc.clone(), ctx.func().to_string());
                    }
                    return Err(err);
                }
            }
        }
        Ok(Status::Next)
    }

    /// Visit every variable reachable from values embedded in this queue,
    /// descending into nested queues.
    pub fn enumerate_reachable(&self, callback: &mut dyn VariableCallback) {
        for node in &self.nodes {
            for arg in node.args.iter() {
                match arg {
                    Operand::Value(value) => value.enumerate_reachable(callback),
                    Operand::Queue(queue) => queue.enumerate_reachable(callback),
                    _ => {}
                }
            }
        }
    }
}

impl fmt::Debug for AvmcQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvmcQueue")
            .field("len", &self.nodes.len())
            .finish_non_exhaustive()
    }
}
