//! Lowering: from statement trees to instruction queues.
//!
//! Each statement and expression kind maps to a short fixed sequence of
//! AVMC nodes; nested bodies become nested queues held as operands, so
//! executing a queue recurses through the native call stack rather than
//! jumping around a flat program. Lowering is also where the static checks
//! live: `break`/`continue` placement against the stack of enclosing
//! constructs, and the reserved `__` name prefix.
//!
//! The executors in this module and in [`expr`] are the only functions
//! whose pointers ever land in a queue node, which is what keeps the
//! operand accessors' panics unreachable from well-formed code.

mod expr;
#[cfg(test)]
mod tests;

use std::rc::Rc;

use rill_ir::{BreakTarget, ContinueTarget, SourceLocation, Stmt, StmtKind};

use crate::avmc::{AvmcQueue, ExecResult, Operand, Uparam};
use crate::context::Executive;
use crate::error::{ErrorKind, LowerError, RuntimeError};
use crate::function::InstantiatedFunction;
use crate::reference::{Modifier, Reference};
use crate::status::Status;
use crate::value::{Compare, Value, Varray, Vobject};

use self::expr::lower_expr;

/// Lower a statement sequence into an executable queue.
///
/// This is the whole-program entry point; the sequence is treated as the
/// body of the top-level function, so a stray `break`, `continue` or
/// reserved name is rejected here.
pub fn generate_code(stmts: &[Stmt]) -> Result<AvmcQueue, LowerError> {
    let mut lowerer = Lowerer::new();
    lowerer.lower_stmts(stmts)
}

/// Squeeze an element, argument or clause count into a node's `x32`.
/// Anything wider would desynchronize the stack protocol, so overflow is
/// fatal, like overrunning the queue length limit.
pub(super) fn operand_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| count_overflow())
}

#[cold]
#[inline(never)]
fn count_overflow() -> ! {
    panic!("operand count exceeds the encodable limit");
}

/// A construct that `break` or `continue` may target. Function boundaries
/// stop the search outright.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Enclosure {
    Switch,
    WhileLoop,
    ForLoop,
    Function,
}

struct Lowerer {
    enclosures: Vec<Enclosure>,
}

impl Lowerer {
    fn new() -> Self {
        Lowerer { enclosures: vec![] }
    }

    fn lower_stmts(&mut self, stmts: &[Stmt]) -> Result<AvmcQueue, LowerError> {
        let mut queue = AvmcQueue::new();
        for stmt in stmts {
            self.lower_stmt(&mut queue, stmt)?;
        }
        queue.shrink_to_fit();
        Ok(queue)
    }

    /// Lower one nested body inside `enclosure`.
    fn lower_enclosed(
        &mut self,
        enclosure: Enclosure,
        stmts: &[Stmt],
    ) -> Result<AvmcQueue, LowerError> {
        self.enclosures.push(enclosure);
        let result = self.lower_stmts(stmts);
        self.enclosures.pop();
        result
    }

    fn lower_stmt(&mut self, queue: &mut AvmcQueue, stmt: &Stmt) -> Result<(), LowerError> {
        let sloc = &stmt.sloc;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                // The previous statement's result is discarded here, not
                // where it was produced.
                queue.append(do_clear_stack, Uparam::none());
                lower_expr(queue, expr)?;
            }

            StmtKind::Block(body) => {
                let body = self.lower_stmts(body)?;
                queue.append_args(
                    do_execute_block,
                    Uparam::none(),
                    vec![Operand::Queue(body)],
                );
            }

            StmtKind::Var {
                name,
                immutable,
                init,
            } => {
                check_declarable(name)?;
                queue.append(do_clear_stack, Uparam::none());
                match init {
                    Some(init) => {
                        queue.append_args(
                            do_declare_variable,
                            Uparam::none(),
                            vec![
                                Operand::Name(name.clone()),
                                Operand::Location(sloc.clone()),
                            ],
                        );
                        lower_expr(queue, init)?;
                        queue.append(
                            do_initialize_variable,
                            Uparam::with_x16(u16::from(*immutable)),
                        );
                    }
                    None => {
                        queue.append_args(
                            do_define_uninitialized_variable,
                            Uparam::with_x16(u16::from(*immutable)),
                            vec![
                                Operand::Name(name.clone()),
                                Operand::Location(sloc.clone()),
                            ],
                        );
                    }
                }
            }

            StmtKind::Func { name, params, body } => {
                check_declarable(name)?;
                for param in params {
                    check_declarable(param)?;
                }
                let body = self.lower_enclosed(Enclosure::Function, body)?;
                let signature = format_signature(name, params);
                let func = InstantiatedFunction::new(
                    sloc.clone(),
                    signature,
                    params.clone(),
                    body,
                );
                queue.append_args(
                    do_define_function,
                    Uparam::none(),
                    vec![
                        Operand::Name(name.clone()),
                        Operand::Location(sloc.clone()),
                        Operand::Value(Value::function(Rc::new(func))),
                    ],
                );
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                queue.append(do_clear_stack, Uparam::none());
                lower_expr(queue, cond)?;
                let then_queue = self.lower_stmts(then_branch)?;
                let else_queue = self.lower_stmts(else_branch)?;
                queue.append_args(
                    do_execute_branch,
                    Uparam::none(),
                    vec![Operand::Queue(then_queue), Operand::Queue(else_queue)],
                );
            }

            StmtKind::Switch { ctrl, clauses } => {
                queue.append(do_clear_stack, Uparam::none());
                lower_expr(queue, ctrl)?;
                let mut args = Vec::with_capacity(clauses.len() * 3);
                for clause in clauses {
                    // The `default` clause lowers to an empty label queue;
                    // a real label always produces at least one node.
                    let mut label = AvmcQueue::new();
                    if let Some(expr) = &clause.label {
                        lower_expr(&mut label, expr)?;
                    }
                    for name in &clause.names {
                        check_declarable(name)?;
                    }
                    let body = self.lower_enclosed(Enclosure::Switch, &clause.body)?;
                    args.push(Operand::Queue(label));
                    args.push(Operand::Queue(body));
                    args.push(Operand::Names(clause.names.clone().into_boxed_slice()));
                }
                let count = operand_count(clauses.len());
                queue.append_args(do_execute_select, Uparam::with_x32(count), args);
            }

            StmtKind::While {
                negative,
                cond,
                body,
            } => {
                let mut cond_queue = AvmcQueue::new();
                lower_expr(&mut cond_queue, cond)?;
                let body = self.lower_enclosed(Enclosure::WhileLoop, body)?;
                queue.append_args(
                    do_execute_while,
                    Uparam::with_x16(u16::from(*negative)),
                    vec![Operand::Queue(cond_queue), Operand::Queue(body)],
                );
            }

            StmtKind::DoWhile {
                body,
                negative,
                cond,
            } => {
                let body = self.lower_enclosed(Enclosure::WhileLoop, body)?;
                let mut cond_queue = AvmcQueue::new();
                lower_expr(&mut cond_queue, cond)?;
                queue.append_args(
                    do_execute_do_while,
                    Uparam::with_x16(u16::from(*negative)),
                    vec![Operand::Queue(body), Operand::Queue(cond_queue)],
                );
            }

            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let init = self.lower_stmts(init)?;
                let mut cond_queue = AvmcQueue::new();
                if let Some(cond) = cond {
                    lower_expr(&mut cond_queue, cond)?;
                }
                let mut step_queue = AvmcQueue::new();
                if let Some(step) = step {
                    lower_expr(&mut step_queue, step)?;
                }
                let body = self.lower_enclosed(Enclosure::ForLoop, body)?;
                queue.append_args(
                    do_execute_for,
                    Uparam::none(),
                    vec![
                        Operand::Queue(init),
                        Operand::Queue(cond_queue),
                        Operand::Queue(step_queue),
                        Operand::Queue(body),
                    ],
                );
            }

            StmtKind::ForEach {
                key,
                mapped,
                range,
                body,
            } => {
                check_declarable(key)?;
                check_declarable(mapped)?;
                queue.append(do_clear_stack, Uparam::none());
                lower_expr(queue, range)?;
                let body = self.lower_enclosed(Enclosure::ForLoop, body)?;
                queue.append_traced(
                    do_execute_for_each,
                    Uparam::none(),
                    sloc.clone(),
                    vec![
                        Operand::Name(key.clone()),
                        Operand::Name(mapped.clone()),
                        Operand::Location(sloc.clone()),
                        Operand::Queue(body),
                    ],
                );
            }

            StmtKind::Try {
                body,
                except,
                handler,
            } => {
                check_declarable(except)?;
                let body = self.lower_stmts(body)?;
                let handler = self.lower_stmts(handler)?;
                queue.append_args(
                    do_execute_try,
                    Uparam::none(),
                    vec![
                        Operand::Queue(body),
                        Operand::Name(except.clone()),
                        Operand::Location(sloc.clone()),
                        Operand::Queue(handler),
                    ],
                );
            }

            StmtKind::Break(target) => {
                let status = self.check_break(*target)?;
                queue.append(do_return_status, Uparam::with_x16(status.to_x16()));
            }

            StmtKind::Continue(target) => {
                let status = self.check_continue(*target)?;
                queue.append(do_return_status, Uparam::with_x16(status.to_x16()));
            }

            StmtKind::Throw(expr) => {
                queue.append(do_clear_stack, Uparam::none());
                lower_expr(queue, expr)?;
                queue.append_traced(do_execute_throw, Uparam::none(), sloc.clone(), vec![]);
            }

            StmtKind::Return(expr) => {
                queue.append(do_clear_stack, Uparam::none());
                if let Some(expr) = expr {
                    lower_expr(queue, expr)?;
                    queue.append(do_convert_to_temporary, Uparam::none());
                }
                queue.append(
                    do_return_status,
                    Uparam::with_x16(Status::Return.to_x16()),
                );
            }

            StmtKind::Assert {
                negative,
                expr,
                message,
            } => {
                queue.append(do_clear_stack, Uparam::none());
                lower_expr(queue, expr)?;
                queue.append_traced(
                    do_execute_assert,
                    Uparam::with_x16(u16::from(*negative)),
                    sloc.clone(),
                    vec![
                        Operand::Location(sloc.clone()),
                        Operand::Value(Value::Str(message.clone())),
                    ],
                );
            }
        }
        Ok(())
    }

    /// Find the construct a `break` would land in, scanning inside out and
    /// stopping at the function boundary.
    fn check_break(&self, target: BreakTarget) -> Result<Status, LowerError> {
        for enclosure in self.enclosures.iter().rev() {
            match (target, enclosure) {
                (_, Enclosure::Function) => break,
                (BreakTarget::Unspecified, _) => return Ok(Status::BreakUnspecified),
                (BreakTarget::Switch, Enclosure::Switch) => return Ok(Status::BreakSwitch),
                (BreakTarget::While, Enclosure::WhileLoop) => return Ok(Status::BreakWhile),
                (BreakTarget::For, Enclosure::ForLoop) => return Ok(Status::BreakFor),
                _ => {}
            }
        }
        Err(LowerError::MisplacedBreak {
            stmt: match target {
                BreakTarget::Unspecified => "break",
                BreakTarget::Switch => "break switch",
                BreakTarget::While => "break while",
                BreakTarget::For => "break for",
            },
        })
    }

    /// As [`check_break`](Self::check_break), but `switch` does not count:
    /// `continue` only targets loops.
    fn check_continue(&self, target: ContinueTarget) -> Result<Status, LowerError> {
        for enclosure in self.enclosures.iter().rev() {
            match (target, enclosure) {
                (_, Enclosure::Function) => break,
                (ContinueTarget::Unspecified, Enclosure::WhileLoop)
                | (ContinueTarget::Unspecified, Enclosure::ForLoop) => {
                    return Ok(Status::ContinueUnspecified)
                }
                (ContinueTarget::While, Enclosure::WhileLoop) => {
                    return Ok(Status::ContinueWhile)
                }
                (ContinueTarget::For, Enclosure::ForLoop) => return Ok(Status::ContinueFor),
                _ => {}
            }
        }
        Err(LowerError::MisplacedContinue {
            stmt: match target {
                ContinueTarget::Unspecified => "continue",
                ContinueTarget::While => "continue while",
                ContinueTarget::For => "continue for",
            },
        })
    }
}

fn check_declarable(name: &str) -> Result<(), LowerError> {
    if name.starts_with("__") {
        return Err(LowerError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn format_signature(name: &str, params: &[Rc<str>]) -> String {
    let mut text = String::from(name);
    text.push('(');
    for (i, param) in params.iter().enumerate() {
        if i != 0 {
            text.push_str(", ");
        }
        text.push_str(param);
    }
    text.push(')');
    text
}

// -- statement executors ---------------------------------------------------

fn do_clear_stack(ctx: &mut Executive<'_>, _uparam: Uparam, _args: &[Operand]) -> ExecResult {
    ctx.stack().clear();
    Ok(Status::Next)
}

fn do_execute_block(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let body = args[0].as_queue();
    let mut scope = ctx.scoped();
    body.execute(&mut scope)
}

fn do_declare_variable(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let name = args[0].as_name();
    let sloc = args[1].as_location();
    let cell = ctx.global().create_variable(sloc.clone());
    ctx.define(name.clone(), Reference::variable(cell.clone()));
    ctx.stack().push(Reference::variable(cell));
    Ok(Status::Next)
}

fn do_initialize_variable(ctx: &mut Executive<'_>, uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let immutable = uparam.x16 != 0;
    let init = ctx.stack().pop();
    let value = init.read()?;
    let target = ctx.stack().pop();
    let cell = target
        .variable_cell()
        .unwrap_or_else(|| panic!("variable initialization without a declared variable"));
    cell.reset(cell.decl(), value, immutable);
    Ok(Status::Next)
}

fn do_define_uninitialized_variable(
    ctx: &mut Executive<'_>,
    uparam: Uparam,
    args: &[Operand],
) -> ExecResult {
    let name = args[0].as_name();
    let sloc = args[1].as_location();
    let cell = ctx.global().create_variable(sloc.clone());
    cell.reset(sloc.clone(), Value::Null, uparam.x16 != 0);
    ctx.define(name.clone(), Reference::variable(cell));
    Ok(Status::Next)
}

fn do_define_function(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let name = args[0].as_name();
    let sloc = args[1].as_location();
    let func = args[2].as_value();
    let cell = ctx.global().create_variable(sloc.clone());
    cell.reset(sloc.clone(), func.clone(), true);
    ctx.define(name.clone(), Reference::variable(cell));
    Ok(Status::Next)
}

fn do_execute_branch(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let cond = ctx.stack().pop().read()?;
    let chosen = if cond.test() {
        args[0].as_queue()
    } else {
        args[1].as_queue()
    };
    let mut scope = ctx.scoped();
    chosen.execute(&mut scope)
}

fn do_execute_select(ctx: &mut Executive<'_>, uparam: Uparam, args: &[Operand]) -> ExecResult {
    let count = uparam.x32 as usize;
    let ctrl = ctx.stack().pop().read()?;
    let mut scope = ctx.scoped();

    // Pick the clause to start from: the first label comparing equal to
    // the control value, else the sole `default`.
    let mut target = None;
    let mut default = None;
    for i in 0..count {
        let label = args[i * 3].as_queue();
        if label.is_empty() {
            if default.replace(i).is_some() {
                return Err(ErrorKind::DuplicateDefault.into());
            }
            continue;
        }
        let status = label.execute(&mut scope)?;
        debug_assert!(status.is_next());
        let candidate = scope.stack().pop().read()?;
        if ctrl.compare(&candidate) == Compare::Equal {
            target = Some(i);
            break;
        }
    }
    let Some(target) = target.or(default) else {
        return Ok(Status::Next);
    };

    // Declarations in skipped clauses are hoisted as uninitialized, the
    // same way fallthrough would cross them.
    for i in 0..target {
        for name in args[i * 3 + 2].as_names() {
            let cell = scope.global().create_variable(SourceLocation::builtin());
            scope.define(name.clone(), Reference::variable(cell));
        }
    }

    // Execute from the target clause, falling through until a `break`.
    for i in target..count {
        let body = args[i * 3 + 1].as_queue();
        match body.execute(&mut scope)? {
            Status::Next => {}
            Status::BreakUnspecified | Status::BreakSwitch => return Ok(Status::Next),
            status => return Ok(status),
        }
    }
    Ok(Status::Next)
}

fn test_condition(
    ctx: &mut Executive<'_>,
    cond: &AvmcQueue,
    negative: bool,
) -> Result<bool, RuntimeError> {
    let status = cond.execute(ctx)?;
    debug_assert!(status.is_next());
    let value = ctx.stack().pop().read()?;
    Ok(value.test() != negative)
}

fn do_execute_while(ctx: &mut Executive<'_>, uparam: Uparam, args: &[Operand]) -> ExecResult {
    let negative = uparam.x16 != 0;
    let cond = args[0].as_queue();
    let body = args[1].as_queue();
    loop {
        if !test_condition(ctx, cond, negative)? {
            return Ok(Status::Next);
        }
        let mut scope = ctx.scoped();
        match body.execute(&mut scope)? {
            Status::Next | Status::ContinueUnspecified | Status::ContinueWhile => {}
            Status::BreakUnspecified | Status::BreakWhile => return Ok(Status::Next),
            status => return Ok(status),
        }
    }
}

fn do_execute_do_while(ctx: &mut Executive<'_>, uparam: Uparam, args: &[Operand]) -> ExecResult {
    let negative = uparam.x16 != 0;
    let body = args[0].as_queue();
    let cond = args[1].as_queue();
    loop {
        {
            let mut scope = ctx.scoped();
            match body.execute(&mut scope)? {
                Status::Next | Status::ContinueUnspecified | Status::ContinueWhile => {}
                Status::BreakUnspecified | Status::BreakWhile => return Ok(Status::Next),
                status => return Ok(status),
            }
        }
        if !test_condition(ctx, cond, negative)? {
            return Ok(Status::Next);
        }
    }
}

fn do_execute_for(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let init = args[0].as_queue();
    let cond = args[1].as_queue();
    let step = args[2].as_queue();
    let body = args[3].as_queue();

    // The init clause scopes over the whole loop.
    let mut outer = ctx.scoped();
    let status = init.execute(&mut outer)?;
    debug_assert!(status.is_next());
    loop {
        // An absent condition loops until broken out of.
        if !cond.is_empty() && !test_condition(&mut outer, cond, false)? {
            return Ok(Status::Next);
        }
        {
            let mut scope = outer.scoped();
            match body.execute(&mut scope)? {
                Status::Next | Status::ContinueUnspecified | Status::ContinueFor => {}
                Status::BreakUnspecified | Status::BreakFor => return Ok(Status::Next),
                status => return Ok(status),
            }
        }
        let status = step.execute(&mut outer)?;
        debug_assert!(status.is_next());
        outer.stack().clear();
    }
}

fn do_execute_for_each(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let key_name = args[0].as_name();
    let mapped_name = args[1].as_name();
    let sloc = args[2].as_location();
    let body = args[3].as_queue();

    let range_ref = ctx.stack().pop();
    let range = range_ref.read()?;

    // Iteration order is fixed up front; elements added by the body are
    // not visited. The mapped name stays a live reference into the range,
    // so writes through it land in the original container.
    let keys: Vec<(Value, Modifier)> = match &range {
        Value::Array(arr) => (0..arr.len())
            .map(|i| {
                let index = i64::try_from(i).unwrap_or(i64::MAX);
                (Value::Int(index), Modifier::ArrayIndex(index))
            })
            .collect(),
        Value::Object(obj) => {
            let mut names: Vec<_> = obj.keys().cloned().collect();
            names.sort();
            names
                .into_iter()
                .map(|k| (Value::Str(k.clone()), Modifier::ObjectKey(k)))
                .collect()
        }
        other => {
            return Err(RuntimeError::type_mismatch(format!(
                "`for each` cannot iterate over a value of type `{}`",
                other.type_name()
            )));
        }
    };

    for (key_value, modifier) in keys {
        let mut scope = ctx.scoped();
        let key_cell = scope.global().create_variable(sloc.clone());
        key_cell.reset(sloc.clone(), key_value, true);
        scope.define(key_name.clone(), Reference::variable(key_cell));
        let mut mapped = range_ref.clone();
        mapped.zoom_in(modifier);
        scope.define(mapped_name.clone(), mapped);

        match body.execute(&mut scope)? {
            Status::Next | Status::ContinueUnspecified | Status::ContinueFor => {}
            Status::BreakUnspecified | Status::BreakFor => return Ok(Status::Next),
            status => return Ok(status),
        }
    }
    Ok(Status::Next)
}

fn do_execute_try(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let body = args[0].as_queue();
    let except = args[1].as_name();
    let sloc = args[2].as_location();
    let handler = args[3].as_queue();

    let caught = {
        let mut scope = ctx.scoped();
        match body.execute(&mut scope) {
            Ok(status) => return Ok(status),
            Err(err) => err,
        }
    };

    // Bind the exception payload and its backtrace, then run the handler
    // in that scope.
    let mut scope = ctx.scoped();
    let except_cell = scope.global().create_variable(sloc.clone());
    except_cell.reset(sloc.clone(), caught.payload(), false);
    scope.define(except.clone(), Reference::variable(except_cell));

    let frames: Varray = caught
        .frames()
        .iter()
        .map(|frame| {
            let mut entry = Vobject::default();
            entry.insert("file".into(), Value::string(frame.location.file()));
            entry.insert("line".into(), Value::Int(i64::from(frame.location.line())));
            entry.insert("function".into(), Value::string(frame.description.as_str()));
            Value::object(entry)
        })
        .collect();
    let trace_cell = scope.global().create_variable(sloc.clone());
    trace_cell.reset(sloc.clone(), Value::array(frames), true);
    scope.define("__backtrace".into(), Reference::variable(trace_cell));

    handler.execute(&mut scope)
}

fn do_return_status(_ctx: &mut Executive<'_>, uparam: Uparam, _args: &[Operand]) -> ExecResult {
    Ok(Status::from_x16(uparam.x16))
}

fn do_execute_throw(ctx: &mut Executive<'_>, _uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let value = ctx.stack().pop().read()?;
    Err(RuntimeError::thrown(value))
}

fn do_convert_to_temporary(
    ctx: &mut Executive<'_>,
    _uparam: Uparam,
    _args: &[Operand],
) -> ExecResult {
    let top = ctx.stack().top_mut();
    *top = top.to_temporary()?;
    Ok(Status::Next)
}

fn do_execute_assert(ctx: &mut Executive<'_>, uparam: Uparam, args: &[Operand]) -> ExecResult {
    let negative = uparam.x16 != 0;
    let value = ctx.stack().pop().read()?;
    if value.test() == negative {
        let sloc = args[0].as_location();
        let message = match args[1].as_value() {
            Value::Str(s) => s.to_string(),
            other => other.to_string(),
        };
        return Err(ErrorKind::AssertionFailed {
            location: sloc.clone(),
            message,
        }
        .into());
    }
    Ok(Status::Next)
}
