//! Expression lowering and the expression executors.
//!
//! Every expression lowers to a node sequence whose net effect on the
//! evaluation stack is exactly one pushed reference. Operands are pushed
//! left to right; operators pop what they consume and push their result,
//! so the sequences compose without any temporaries outside the stack.

use rill_ir::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};

use crate::avmc::{AvmcQueue, ExecResult, Operand, Uparam};
use crate::context::Executive;
use crate::error::{ErrorKind, LowerError, RuntimeError};
use crate::reference::{Modifier, Reference};
use crate::status::Status;
use crate::value::{Compare, Value, Vobject};

/// Lower one expression; the emitted nodes leave its result on top of the
/// evaluation stack.
pub(super) fn lower_expr(queue: &mut AvmcQueue, expr: &Expr) -> Result<(), LowerError> {
    let sloc = &expr.sloc;
    match &expr.kind {
        ExprKind::Literal(literal) => {
            let value = match literal {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Real(r) => Value::Real(*r),
                Literal::Str(s) => Value::Str(s.clone()),
            };
            queue.append_args(
                do_push_constant,
                Uparam::none(),
                vec![Operand::Value(value)],
            );
        }

        ExprKind::Name(name) => {
            queue.append_traced(
                do_push_named_reference,
                Uparam::none(),
                sloc.clone(),
                vec![Operand::Name(name.clone())],
            );
        }

        ExprKind::Array(elems) => {
            for elem in elems {
                lower_expr(queue, elem)?;
            }
            let count = super::operand_count(elems.len());
            queue.append(do_build_array, Uparam::with_x32(count));
        }

        ExprKind::Object(pairs) => {
            let mut keys = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                keys.push(key.clone());
                lower_expr(queue, value)?;
            }
            let count = super::operand_count(pairs.len());
            queue.append_args(
                do_build_object,
                Uparam::with_x32(count),
                vec![Operand::Names(keys.into_boxed_slice())],
            );
        }

        ExprKind::Index { base, index } => {
            lower_expr(queue, base)?;
            lower_expr(queue, index)?;
            queue.append_traced(do_zoom_in_dynamic, Uparam::none(), sloc.clone(), vec![]);
        }

        ExprKind::Member { base, key } => {
            lower_expr(queue, base)?;
            queue.append_args(
                do_zoom_in_static,
                Uparam::none(),
                vec![Operand::Name(key.clone())],
            );
        }

        ExprKind::Assign { target, value } => {
            lower_expr(queue, target)?;
            lower_expr(queue, value)?;
            queue.append_traced(do_assign, Uparam::none(), sloc.clone(), vec![]);
        }

        ExprKind::Unset(target) => {
            lower_expr(queue, target)?;
            queue.append_traced(do_unset, Uparam::none(), sloc.clone(), vec![]);
        }

        ExprKind::Call { callee, args } => {
            lower_expr(queue, callee)?;
            for arg in args {
                lower_expr(queue, arg)?;
            }
            let count = super::operand_count(args.len());
            queue.append_traced(
                do_function_call,
                Uparam::with_x32(count),
                sloc.clone(),
                vec![],
            );
        }

        ExprKind::Unary { op, operand } => {
            lower_expr(queue, operand)?;
            queue.append_traced(
                do_apply_unary,
                Uparam::with_x16(unary_to_x16(*op)),
                sloc.clone(),
                vec![],
            );
        }

        ExprKind::Binary { op, lhs, rhs } => {
            lower_expr(queue, lhs)?;
            lower_expr(queue, rhs)?;
            queue.append_traced(
                do_apply_binary,
                Uparam::with_x16(binary_to_x16(*op)),
                sloc.clone(),
                vec![],
            );
        }
    }
    Ok(())
}

fn unary_to_x16(op: UnaryOp) -> u16 {
    match op {
        UnaryOp::Neg => 0,
        UnaryOp::Not => 1,
    }
}

#[track_caller]
fn unary_from_x16(code: u16) -> UnaryOp {
    match code {
        0 => UnaryOp::Neg,
        1 => UnaryOp::Not,
        other => panic!("invalid unary operator code `{other}` in an AVMC node"),
    }
}

fn binary_to_x16(op: BinaryOp) -> u16 {
    match op {
        BinaryOp::Add => 0,
        BinaryOp::Sub => 1,
        BinaryOp::Mul => 2,
        BinaryOp::Div => 3,
        BinaryOp::Rem => 4,
        BinaryOp::Eq => 5,
        BinaryOp::Ne => 6,
        BinaryOp::Lt => 7,
        BinaryOp::Gt => 8,
        BinaryOp::Lte => 9,
        BinaryOp::Gte => 10,
    }
}

#[track_caller]
fn binary_from_x16(code: u16) -> BinaryOp {
    match code {
        0 => BinaryOp::Add,
        1 => BinaryOp::Sub,
        2 => BinaryOp::Mul,
        3 => BinaryOp::Div,
        4 => BinaryOp::Rem,
        5 => BinaryOp::Eq,
        6 => BinaryOp::Ne,
        7 => BinaryOp::Lt,
        8 => BinaryOp::Gt,
        9 => BinaryOp::Lte,
        10 => BinaryOp::Gte,
        other => panic!("invalid binary operator code `{other}` in an AVMC node"),
    }
}

// -- expression executors --------------------------------------------------

fn do_push_constant(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    ctx.stack()
        .push(Reference::constant(args[0].as_value().clone()));
    Ok(Status::Next)
}

fn do_push_named_reference(
    ctx: &mut Executive<'_>,
    _uparam: Uparam,
    args: &[Operand],
) -> ExecResult {
    let name = args[0].as_name();
    match ctx.lookup(name) {
        Some(reference) => {
            ctx.stack().push(reference);
            Ok(Status::Next)
        }
        None => Err(ErrorKind::UndefinedName {
            name: name.to_string(),
        }
        .into()),
    }
}

fn do_build_array(ctx: &mut Executive<'_>, uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let count = uparam.x32 as usize;
    let refs = ctx.stack().pop_many(count);
    let mut items = Vec::with_capacity(count);
    for r in refs {
        items.push(r.read()?);
    }
    ctx.stack().push(Reference::temporary(Value::array(items)));
    Ok(Status::Next)
}

fn do_build_object(ctx: &mut Executive<'_>, uparam: Uparam, args: &[Operand]) -> ExecResult {
    let count = uparam.x32 as usize;
    let keys = args[0].as_names();
    let refs = ctx.stack().pop_many(count);
    let mut entries = Vobject::default();
    // A repeated key keeps its last value.
    for (key, r) in keys.iter().zip(refs) {
        entries.insert(key.clone(), r.read()?);
    }
    ctx.stack()
        .push(Reference::temporary(Value::object(entries)));
    Ok(Status::Next)
}

fn do_zoom_in_dynamic(ctx: &mut Executive<'_>, _uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let subscript = ctx.stack().pop().read()?;
    let modifier = match subscript {
        Value::Int(i) => Modifier::ArrayIndex(i),
        Value::Str(s) => Modifier::ObjectKey(s),
        other => {
            return Err(RuntimeError::type_mismatch(format!(
                "a subscript must be an integer or a string, not a value of type `{}`",
                other.type_name()
            )));
        }
    };
    ctx.stack().top_mut().zoom_in(modifier);
    Ok(Status::Next)
}

fn do_zoom_in_static(ctx: &mut Executive<'_>, _uparam: Uparam, args: &[Operand]) -> ExecResult {
    let key = args[0].as_name();
    ctx.stack()
        .top_mut()
        .zoom_in(Modifier::ObjectKey(key.clone()));
    Ok(Status::Next)
}

fn do_assign(ctx: &mut Executive<'_>, _uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let value = ctx.stack().pop().read()?;
    // The target stays on the stack as the result of the assignment.
    ctx.stack().top().write(value)?;
    Ok(Status::Next)
}

fn do_unset(ctx: &mut Executive<'_>, _uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let target = ctx.stack().pop();
    let old = target.unset()?;
    ctx.stack().push(Reference::temporary(old));
    Ok(Status::Next)
}

fn do_function_call(ctx: &mut Executive<'_>, uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let count = uparam.x32 as usize;
    let args = ctx.stack().pop_many(count);
    let callee = ctx.stack().pop().read()?;
    let Value::Function(func) = callee else {
        return Err(ErrorKind::NotCallable {
            actual: callee.type_name(),
        }
        .into());
    };
    let result = func.invoke(ctx.global(), args)?;
    ctx.stack().push(result);
    Ok(Status::Next)
}

fn do_apply_unary(ctx: &mut Executive<'_>, uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let operand = ctx.stack().pop().read()?;
    let result = match unary_from_x16(uparam.x16) {
        UnaryOp::Not => Value::Bool(!operand.test()),
        UnaryOp::Neg => match operand {
            Value::Int(i) => match i.checked_neg() {
                Some(n) => Value::Int(n),
                None => {
                    return Err(RuntimeError::arithmetic(format!(
                        "integer negation of `{i}` overflowed"
                    )));
                }
            },
            Value::Real(r) => Value::Real(-r),
            other => {
                return Err(RuntimeError::type_mismatch(format!(
                    "`-` is not applicable to a value of type `{}`",
                    other.type_name()
                )));
            }
        },
    };
    ctx.stack().push(Reference::temporary(result));
    Ok(Status::Next)
}

fn do_apply_binary(ctx: &mut Executive<'_>, uparam: Uparam, _args: &[Operand]) -> ExecResult {
    let op = binary_from_x16(uparam.x16);
    let rhs = ctx.stack().pop().read()?;
    let lhs = ctx.stack().pop().read()?;
    let result = apply_binary(op, &lhs, &rhs)?;
    ctx.stack().push(Reference::temporary(result));
    Ok(Status::Next)
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            apply_arithmetic(op, lhs, rhs)
        }
        BinaryOp::Eq => Ok(Value::Bool(lhs.compare(rhs) == Compare::Equal)),
        BinaryOp::Ne => Ok(Value::Bool(lhs.compare(rhs) != Compare::Equal)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Lte | BinaryOp::Gte => {
            let ordered = match lhs.compare(rhs) {
                Compare::Unordered => {
                    return Err(RuntimeError::arithmetic(format!(
                        "values of type `{}` and `{}` are unordered",
                        lhs.type_name(),
                        rhs.type_name()
                    )));
                }
                ordered => ordered,
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordered == Compare::Less,
                BinaryOp::Gt => ordered == Compare::Greater,
                BinaryOp::Lte => ordered != Compare::Greater,
                _ => ordered != Compare::Less,
            }))
        }
    }
}

fn apply_arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div | BinaryOp::Rem if *b == 0 => {
                    return Err(RuntimeError::arithmetic(format!(
                        "integer division of `{a}` by zero"
                    )));
                }
                BinaryOp::Div => a.checked_div(*b),
                BinaryOp::Rem => a.checked_rem(*b),
                _ => unreachable!(),
            };
            match result {
                Some(n) => Ok(Value::Int(n)),
                None => Err(RuntimeError::arithmetic(format!(
                    "integer operation `{a} {} {b}` overflowed",
                    op.symbol()
                ))),
            }
        }
        // Mixed integer/real arithmetic promotes to real.
        (Value::Int(a), Value::Real(b)) => apply_real(op, *a as f64, *b),
        (Value::Real(a), Value::Int(b)) => apply_real(op, *a, *b as f64),
        (Value::Real(a), Value::Real(b)) => apply_real(op, *a, *b),
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::string(joined))
        }
        _ => Err(RuntimeError::type_mismatch(format!(
            "`{}` is not applicable to values of type `{}` and `{}`",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

// Real arithmetic never fails; division by zero and overflow produce
// infinities and NaN per IEEE 754.
fn apply_real(op: BinaryOp, a: f64, b: f64) -> Result<Value, RuntimeError> {
    Ok(Value::Real(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => unreachable!(),
    }))
}
