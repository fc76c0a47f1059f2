#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use rill_ir::{
    BinaryOp, BreakTarget, ContinueTarget, Expr, ExprKind, Literal, SourceLocation, Stmt,
    StmtKind, SwitchClause, UnaryOp,
};

use crate::context::Executive;
use crate::error::{ErrorKind, LowerError, RuntimeError};
use crate::global::GlobalContext;
use crate::status::Status;
use crate::value::Value;

use super::{generate_code, operand_count};

fn sloc(line: u32) -> SourceLocation {
    SourceLocation::new("test.rl", line)
}

fn expr(kind: ExprKind) -> Expr {
    Expr::new(sloc(1), kind)
}

fn expr_at(line: u32, kind: ExprKind) -> Expr {
    Expr::new(sloc(line), kind)
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(sloc(1), kind)
}

fn int(i: i64) -> Expr {
    expr(ExprKind::Literal(Literal::Int(i)))
}

fn name(n: &str) -> Expr {
    expr(ExprKind::Name(n.into()))
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn assign(target: Expr, value: Expr) -> Expr {
    expr(ExprKind::Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

fn index(base: Expr, subscript: Expr) -> Expr {
    expr(ExprKind::Index {
        base: Box::new(base),
        index: Box::new(subscript),
    })
}

fn var(n: &str, init: Expr) -> Stmt {
    stmt(StmtKind::Var {
        name: n.into(),
        immutable: false,
        init: Some(init),
    })
}

fn ret(value: Expr) -> Stmt {
    stmt(StmtKind::Return(Some(value)))
}

/// Lower and execute a top-level program, yielding its return value.
fn run(stmts: &[Stmt]) -> Result<Value, RuntimeError> {
    let queue = generate_code(stmts).expect("lowering failed");
    let global = GlobalContext::new();
    let mut ctx = Executive::new(&global, "<main>");
    match queue.execute(&mut ctx)? {
        Status::Return if !ctx.stack().is_empty() => ctx.stack().pop().read(),
        _ => Ok(Value::Null),
    }
}

#[test]
fn arithmetic_follows_precedence_in_the_tree() {
    // var a = 1 + 2 * 3; return a;
    let program = [
        var(
            "a",
            binary(
                BinaryOp::Add,
                int(1),
                binary(BinaryOp::Mul, int(2), int(3)),
            ),
        ),
        ret(name("a")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(7));
}

#[test]
fn negative_index_assignment_lands_at_the_back() {
    // var a = [1, 2, 3]; a[-1] = 99; return a[2];
    let program = [
        var(
            "a",
            expr(ExprKind::Array(vec![int(1), int(2), int(3)])),
        ),
        stmt(StmtKind::Expr(assign(index(name("a"), int(-1)), int(99)))),
        ret(index(name("a"), int(2))),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(99));
}

#[test]
fn member_access_and_object_literals() {
    // var o = { x: 1 }; o.y = o.x + 1; return o.y;
    let member = |base: Expr, key: &str| {
        expr(ExprKind::Member {
            base: Box::new(base),
            key: key.into(),
        })
    };
    let program = [
        var("o", expr(ExprKind::Object(vec![("x".into(), int(1))]))),
        stmt(StmtKind::Expr(assign(
            member(name("o"), "y"),
            binary(BinaryOp::Add, member(name("o"), "x"), int(1)),
        ))),
        ret(member(name("o"), "y")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(2));
}

#[test]
fn if_takes_the_matching_branch() {
    let program = [
        var("a", int(0)),
        stmt(StmtKind::If {
            cond: binary(BinaryOp::Lt, int(1), int(2)),
            then_branch: vec![stmt(StmtKind::Expr(assign(name("a"), int(10))))],
            else_branch: vec![stmt(StmtKind::Expr(assign(name("a"), int(20))))],
        }),
        ret(name("a")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(10));
}

#[test]
fn while_loop_counts_and_terminates() {
    // var i = 0; var sum = 0; while (i < 5) { sum = sum + i; i = i + 1; }
    let program = [
        var("i", int(0)),
        var("sum", int(0)),
        stmt(StmtKind::While {
            negative: false,
            cond: binary(BinaryOp::Lt, name("i"), int(5)),
            body: vec![
                stmt(StmtKind::Expr(assign(
                    name("sum"),
                    binary(BinaryOp::Add, name("sum"), name("i")),
                ))),
                stmt(StmtKind::Expr(assign(
                    name("i"),
                    binary(BinaryOp::Add, name("i"), int(1)),
                ))),
            ],
        }),
        ret(name("sum")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(10));
}

#[test]
fn do_while_runs_the_body_at_least_once() {
    let program = [
        var("a", int(0)),
        stmt(StmtKind::DoWhile {
            body: vec![stmt(StmtKind::Expr(assign(name("a"), int(1))))],
            negative: false,
            cond: expr(ExprKind::Literal(Literal::Bool(false))),
        }),
        ret(name("a")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(1));
}

#[test]
fn for_loop_with_init_cond_and_step() {
    // var sum = 0; for (var i = 0; i < 4; i = i + 1) { sum = sum + i; }
    let program = [
        var("sum", int(0)),
        stmt(StmtKind::For {
            init: vec![var("i", int(0))],
            cond: Some(binary(BinaryOp::Lt, name("i"), int(4))),
            step: Some(assign(name("i"), binary(BinaryOp::Add, name("i"), int(1)))),
            body: vec![stmt(StmtKind::Expr(assign(
                name("sum"),
                binary(BinaryOp::Add, name("sum"), name("i")),
            )))],
        }),
        ret(name("sum")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(6));
}

#[test]
fn unconditional_for_exits_through_break() {
    let program = [
        var("i", int(0)),
        stmt(StmtKind::For {
            init: vec![],
            cond: None,
            step: None,
            body: vec![
                stmt(StmtKind::Expr(assign(
                    name("i"),
                    binary(BinaryOp::Add, name("i"), int(1)),
                ))),
                stmt(StmtKind::If {
                    cond: binary(BinaryOp::Gte, name("i"), int(3)),
                    then_branch: vec![stmt(StmtKind::Break(BreakTarget::Unspecified))],
                    else_branch: vec![],
                }),
            ],
        }),
        ret(name("i")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(3));
}

#[test]
fn continue_skips_to_the_next_iteration() {
    // Sum only the even numbers below 6.
    let program = [
        var("sum", int(0)),
        stmt(StmtKind::For {
            init: vec![var("i", int(0))],
            cond: Some(binary(BinaryOp::Lt, name("i"), int(6))),
            step: Some(assign(name("i"), binary(BinaryOp::Add, name("i"), int(1)))),
            body: vec![
                stmt(StmtKind::If {
                    cond: binary(
                        BinaryOp::Ne,
                        binary(BinaryOp::Rem, name("i"), int(2)),
                        int(0),
                    ),
                    then_branch: vec![stmt(StmtKind::Continue(ContinueTarget::Unspecified))],
                    else_branch: vec![],
                }),
                stmt(StmtKind::Expr(assign(
                    name("sum"),
                    binary(BinaryOp::Add, name("sum"), name("i")),
                ))),
            ],
        }),
        ret(name("sum")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(6));
}

#[test]
fn for_each_iterates_an_array_in_order() {
    // for each (k, v : [10, 20, 30]) { sum = sum + v + k; }
    let program = [
        var("sum", int(0)),
        stmt(StmtKind::ForEach {
            key: "k".into(),
            mapped: "v".into(),
            range: expr(ExprKind::Array(vec![int(10), int(20), int(30)])),
            body: vec![stmt(StmtKind::Expr(assign(
                name("sum"),
                binary(
                    BinaryOp::Add,
                    binary(BinaryOp::Add, name("sum"), name("v")),
                    name("k"),
                ),
            )))],
        }),
        ret(name("sum")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(63));
}

#[test]
fn for_each_writes_through_the_mapped_reference() {
    // var a = [1, 2]; for each (k, v : a) { v = v * 10; } return a[1];
    let program = [
        var("a", expr(ExprKind::Array(vec![int(1), int(2)]))),
        stmt(StmtKind::ForEach {
            key: "k".into(),
            mapped: "v".into(),
            range: name("a"),
            body: vec![stmt(StmtKind::Expr(assign(
                name("v"),
                binary(BinaryOp::Mul, name("v"), int(10)),
            )))],
        }),
        ret(index(name("a"), int(1))),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(20));
}

#[test]
fn switch_matches_falls_through_and_breaks() {
    // switch (2): clause 1 sets a=1 and breaks; clause 2 sets a=2 and
    // falls through into default, which adds 10.
    let clause = |label: Option<Expr>, body: Vec<Stmt>| SwitchClause {
        label,
        body,
        names: vec![],
    };
    let program = [
        var("a", int(0)),
        stmt(StmtKind::Switch {
            ctrl: int(2),
            clauses: vec![
                clause(
                    Some(int(1)),
                    vec![
                        stmt(StmtKind::Expr(assign(name("a"), int(1)))),
                        stmt(StmtKind::Break(BreakTarget::Switch)),
                    ],
                ),
                clause(
                    Some(int(2)),
                    vec![stmt(StmtKind::Expr(assign(name("a"), int(2))))],
                ),
                clause(
                    None,
                    vec![stmt(StmtKind::Expr(assign(
                        name("a"),
                        binary(BinaryOp::Add, name("a"), int(10)),
                    )))],
                ),
            ],
        }),
        ret(name("a")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(12));
}

#[test]
fn switch_with_no_match_and_no_default_does_nothing() {
    let program = [
        var("a", int(5)),
        stmt(StmtKind::Switch {
            ctrl: int(9),
            clauses: vec![SwitchClause {
                label: Some(int(1)),
                body: vec![stmt(StmtKind::Expr(assign(name("a"), int(1))))],
                names: vec![],
            }],
        }),
        ret(name("a")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(5));
}

#[test]
fn skipped_switch_clauses_hoist_their_declarations() {
    // Jumping into clause 2 hoists clause 1's `x` as an uninitialized
    // variable, so the fallthrough body can still assign and read it.
    let program = [
        var("a", int(0)),
        stmt(StmtKind::Switch {
            ctrl: int(2),
            clauses: vec![
                SwitchClause {
                    label: Some(int(1)),
                    body: vec![var("x", int(7))],
                    names: vec!["x".into()],
                },
                SwitchClause {
                    label: Some(int(2)),
                    body: vec![
                        stmt(StmtKind::Expr(assign(name("x"), int(5)))),
                        stmt(StmtKind::Expr(assign(name("a"), name("x")))),
                    ],
                    names: vec![],
                },
            ],
        }),
        ret(name("a")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(5));
}

#[test]
fn break_switch_passes_through_an_enclosing_loop() {
    // switch (1): the matching clause runs a while loop whose body does
    // `break switch`. The loop must not consume that status; it exits the
    // whole switch, skipping the rest of the clause body.
    let program = [
        var("a", int(0)),
        stmt(StmtKind::Switch {
            ctrl: int(1),
            clauses: vec![SwitchClause {
                label: Some(int(1)),
                body: vec![
                    stmt(StmtKind::While {
                        negative: false,
                        cond: expr(ExprKind::Literal(Literal::Bool(true))),
                        body: vec![
                            stmt(StmtKind::Expr(assign(
                                name("a"),
                                binary(BinaryOp::Add, name("a"), int(1)),
                            ))),
                            stmt(StmtKind::Break(BreakTarget::Switch)),
                        ],
                    }),
                    stmt(StmtKind::Expr(assign(name("a"), int(100)))),
                ],
                names: vec![],
            }],
        }),
        ret(name("a")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(1));
}

#[test]
fn duplicate_default_clauses_are_a_runtime_error() {
    let default = SwitchClause {
        label: None,
        body: vec![],
        names: vec![],
    };
    let program = [stmt(StmtKind::Switch {
        ctrl: int(0),
        clauses: vec![default.clone(), default],
    })];
    let err = run(&program).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::DuplicateDefault));
}

#[test]
fn functions_bind_parameters_and_return_values() {
    // func add(a, b) { return a + b; } return add(2, 3);
    let program = [
        stmt(StmtKind::Func {
            name: "add".into(),
            params: vec!["a".into(), "b".into()],
            body: vec![ret(binary(BinaryOp::Add, name("a"), name("b")))],
        }),
        ret(expr(ExprKind::Call {
            callee: Box::new(name("add")),
            args: vec![int(2), int(3)],
        })),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(5));
}

#[test]
fn calling_a_non_function_fails() {
    let program = [stmt(StmtKind::Expr(expr(ExprKind::Call {
        callee: Box::new(int(42)),
        args: vec![],
    })))];
    let err = run(&program).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::NotCallable { actual: "integer" }
    ));
}

#[test]
fn thrown_values_are_caught_with_a_backtrace() {
    // try { throw "oops"; } catch (e) { return e; }
    let program = [stmt(StmtKind::Try {
        body: vec![stmt(StmtKind::Throw(expr(ExprKind::Literal(
            Literal::Str("oops".into()),
        ))))],
        except: "e".into(),
        handler: vec![ret(name("e"))],
    })];
    assert_eq!(run(&program).unwrap(), Value::string("oops"));
}

#[test]
fn the_backtrace_binding_lists_throw_sites() {
    // try { throw 1; } catch (e) { return __backtrace; }
    let throw = Stmt::new(sloc(7), StmtKind::Throw(expr_at(7, ExprKind::Literal(Literal::Int(1)))));
    let program = [stmt(StmtKind::Try {
        body: vec![throw],
        except: "e".into(),
        handler: vec![ret(name("__backtrace"))],
    })];
    let got = run(&program).unwrap();
    let Value::Array(frames) = got else {
        panic!("expected a backtrace array, got {got:?}");
    };
    assert!(!frames.is_empty());
    let Value::Object(first) = &frames[0] else {
        panic!("expected a frame object");
    };
    assert_eq!(first["file"], Value::string("test.rl"));
    assert_eq!(first["line"], Value::Int(7));
}

#[test]
fn uncaught_throws_carry_their_payload() {
    let program = [stmt(StmtKind::Throw(int(3)))];
    let err = run(&program).unwrap_err();
    assert_eq!(err.payload(), Value::Int(3));
    assert!(!err.frames().is_empty());
}

#[test]
fn unset_removes_and_yields_the_old_value() {
    // var a = [1, 2, 3]; var old = unset a[0]; return old + a[0];
    let program = [
        var(
            "a",
            expr(ExprKind::Array(vec![int(1), int(2), int(3)])),
        ),
        var("old", expr(ExprKind::Unset(Box::new(index(name("a"), int(0)))))),
        ret(binary(BinaryOp::Add, name("old"), index(name("a"), int(0)))),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(3));
}

#[test]
fn assignment_to_a_const_is_rejected() {
    let program = [
        stmt(StmtKind::Var {
            name: "c".into(),
            immutable: true,
            init: Some(int(1)),
        }),
        stmt(StmtKind::Expr(assign(name("c"), int(2)))),
    ];
    let err = run(&program).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ImmutableAccess { .. }));
}

#[test]
fn undefined_names_fail_with_a_located_frame() {
    let program = [stmt(StmtKind::Expr(expr_at(4, ExprKind::Name("nope".into()))))];
    let err = run(&program).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UndefinedName { .. }));
    assert_eq!(err.frames()[0].location.line(), 4);
}

#[test]
fn assertions_fail_with_their_message() {
    let program = [stmt(StmtKind::Assert {
        negative: false,
        expr: expr(ExprKind::Literal(Literal::Bool(false))),
        message: "must hold".into(),
    })];
    let err = run(&program).unwrap_err();
    match err.kind() {
        ErrorKind::AssertionFailed { message, .. } => assert_eq!(message, "must hold"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn negative_assertions_pass_on_falsehood() {
    let program = [
        stmt(StmtKind::Assert {
            negative: true,
            expr: expr(ExprKind::Literal(Literal::Bool(false))),
            message: "".into(),
        }),
        ret(int(1)),
    ];
    assert_eq!(run(&program).unwrap(), Value::Int(1));
}

#[test]
fn division_by_zero_and_overflow_are_arithmetic_errors() {
    let div = [ret(binary(BinaryOp::Div, int(1), int(0)))];
    assert!(matches!(
        run(&div).unwrap_err().kind(),
        ErrorKind::Arithmetic { .. }
    ));

    let overflow = [ret(binary(BinaryOp::Add, int(i64::MAX), int(1)))];
    assert!(matches!(
        run(&overflow).unwrap_err().kind(),
        ErrorKind::Arithmetic { .. }
    ));
}

#[test]
fn string_concatenation_and_unary_operators() {
    let lit = |s: &str| expr(ExprKind::Literal(Literal::Str(s.into())));
    let program = [ret(binary(BinaryOp::Add, lit("foo"), lit("bar")))];
    assert_eq!(run(&program).unwrap(), Value::string("foobar"));

    let neg = [ret(expr(ExprKind::Unary {
        op: UnaryOp::Neg,
        operand: Box::new(int(5)),
    }))];
    assert_eq!(run(&neg).unwrap(), Value::Int(-5));

    let not = [ret(expr(ExprKind::Unary {
        op: UnaryOp::Not,
        operand: Box::new(expr(ExprKind::Literal(Literal::Null))),
    }))];
    assert_eq!(run(&not).unwrap(), Value::Bool(true));
}

#[test]
fn relational_comparison_of_unordered_values_fails() {
    let program = [ret(binary(
        BinaryOp::Lt,
        int(1),
        expr(ExprKind::Literal(Literal::Str("x".into()))),
    ))];
    assert!(matches!(
        run(&program).unwrap_err().kind(),
        ErrorKind::Arithmetic { .. }
    ));
}

#[test]
fn misplaced_break_and_continue_are_lowering_errors() {
    let stray_break = [stmt(StmtKind::Break(BreakTarget::While))];
    assert_eq!(
        generate_code(&stray_break).unwrap_err(),
        LowerError::MisplacedBreak {
            stmt: "break while"
        }
    );

    // A function boundary hides the enclosing loop.
    let hidden = [stmt(StmtKind::While {
        negative: false,
        cond: expr(ExprKind::Literal(Literal::Bool(true))),
        body: vec![stmt(StmtKind::Func {
            name: "f".into(),
            params: vec![],
            body: vec![stmt(StmtKind::Continue(ContinueTarget::Unspecified))],
        })],
    })];
    assert_eq!(
        generate_code(&hidden).unwrap_err(),
        LowerError::MisplacedContinue { stmt: "continue" }
    );
}

#[test]
fn break_switch_does_not_target_a_loop() {
    let program = [stmt(StmtKind::While {
        negative: false,
        cond: expr(ExprKind::Literal(Literal::Bool(true))),
        body: vec![stmt(StmtKind::Break(BreakTarget::Switch))],
    })];
    assert!(matches!(
        generate_code(&program).unwrap_err(),
        LowerError::MisplacedBreak { .. }
    ));
}

#[test]
fn reserved_names_cannot_be_declared() {
    let program = [var("__secret", int(1))];
    assert_eq!(
        generate_code(&program).unwrap_err(),
        LowerError::ReservedName {
            name: "__secret".to_string()
        }
    );
}

#[test]
fn block_scopes_unwind_their_declarations() {
    // { var inner = 1; } return inner; -> undefined
    let program = [
        stmt(StmtKind::Block(vec![var("inner", int(1))])),
        ret(name("inner")),
    ];
    assert!(matches!(
        run(&program).unwrap_err().kind(),
        ErrorKind::UndefinedName { .. }
    ));
}

#[test]
fn vivification_builds_nested_containers_on_write() {
    // var a; a[2].k = 10.5; return a[2].k;
    let member = |base: Expr, key: &str| {
        expr(ExprKind::Member {
            base: Box::new(base),
            key: key.into(),
        })
    };
    let program = [
        stmt(StmtKind::Var {
            name: "a".into(),
            immutable: false,
            init: None,
        }),
        stmt(StmtKind::Expr(assign(
            member(index(name("a"), int(2)), "k"),
            expr(ExprKind::Literal(Literal::Real(10.5))),
        ))),
        ret(member(index(name("a"), int(2)), "k")),
    ];
    assert_eq!(run(&program).unwrap(), Value::Real(10.5));
}

#[test]
fn operand_counts_encode_without_clamping() {
    assert_eq!(operand_count(0), 0);
    assert_eq!(operand_count(u32::MAX as usize), u32::MAX);
}

#[test]
#[should_panic(expected = "encodable limit")]
fn oversized_operand_counts_are_fatal() {
    operand_count(u32::MAX as usize + 1);
}
