//! Statement and expression nodes.
//!
//! These are the trees an external parser hands to the lowering pass. Every
//! node carries the source location it came from; the lowering copies it
//! into the symbol block of the AVMC nodes it emits, which is where
//! backtrace frames come from.
//!
//! `continue` cannot target a `switch`: `ContinueTarget` simply has no such
//! variant, so the mismatch is unrepresentable rather than checked.

use std::rc::Rc;

use crate::location::SourceLocation;

/// A statement with its source location.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub sloc: SourceLocation,
    pub kind: StmtKind,
}

impl Stmt {
    #[inline]
    pub fn new(sloc: SourceLocation, kind: StmtKind) -> Self {
        Stmt { sloc, kind }
    }
}

/// Statement kinds.
#[derive(Clone, Debug)]
pub enum StmtKind {
    /// An expression evaluated for its effects; its result is left on the
    /// evaluation stack for the next statement to discard.
    Expr(Expr),
    /// A braced block with its own scope.
    Block(Vec<Stmt>),
    /// `var name = init;` or `const name = init;` (`immutable` = true).
    Var {
        name: Rc<str>,
        immutable: bool,
        init: Option<Expr>,
    },
    /// `func name(params) { body }` - binds an immutable function variable.
    Func {
        name: Rc<str>,
        params: Vec<Rc<str>>,
        body: Vec<Stmt>,
    },
    /// `if (cond) then_branch else else_branch`.
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    /// `switch (ctrl) { ... }`. Clauses run in order from the first match,
    /// falling through until a `break`.
    Switch { ctrl: Expr, clauses: Vec<SwitchClause> },
    /// `while (cond) { body }`; `negative` flips the test (`until`).
    While {
        negative: bool,
        cond: Expr,
        body: Vec<Stmt>,
    },
    /// `do { body } while (cond);`
    DoWhile {
        body: Vec<Stmt>,
        negative: bool,
        cond: Expr,
    },
    /// `for (init; cond; step) { body }`; an absent condition loops forever.
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    /// `for each (key, mapped : range) { body }`.
    ForEach {
        key: Rc<str>,
        mapped: Rc<str>,
        range: Expr,
        body: Vec<Stmt>,
    },
    /// `try { body } catch (except) { handler }`.
    Try {
        body: Vec<Stmt>,
        except: Rc<str>,
        handler: Vec<Stmt>,
    },
    /// `break;` / `break switch;` / `break while;` / `break for;`
    Break(BreakTarget),
    /// `continue;` / `continue while;` / `continue for;`
    Continue(ContinueTarget),
    /// `throw expr;`
    Throw(Expr),
    /// `return;` or `return expr;`
    Return(Option<Expr>),
    /// `assert expr : "message";`; `negative` asserts falsehood.
    Assert {
        negative: bool,
        expr: Expr,
        message: Rc<str>,
    },
}

/// One clause of a `switch` statement.
///
/// A `label` of `None` is the `default` clause. Declared names are hoisted
/// into the switch scope even when their clause is skipped, mirroring how
/// fallthrough crosses declarations.
#[derive(Clone, Debug)]
pub struct SwitchClause {
    pub label: Option<Expr>,
    pub body: Vec<Stmt>,
    pub names: Vec<Rc<str>>,
}

/// What an unlabelled or labelled `break` targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakTarget {
    Unspecified,
    Switch,
    While,
    For,
}

/// What an unlabelled or labelled `continue` targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContinueTarget {
    Unspecified,
    While,
    For,
}

/// An expression with its source location.
#[derive(Clone, Debug)]
pub struct Expr {
    pub sloc: SourceLocation,
    pub kind: ExprKind,
}

impl Expr {
    #[inline]
    pub fn new(sloc: SourceLocation, kind: ExprKind) -> Self {
        Expr { sloc, kind }
    }
}

/// Expression kinds.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// A literal constant.
    Literal(Literal),
    /// A named reference, resolved against the scope chain at run time.
    Name(Rc<str>),
    /// `[ a, b, c ]`
    Array(Vec<Expr>),
    /// `{ key: value, ... }`
    Object(Vec<(Rc<str>, Expr)>),
    /// `base[index]` - the index expression is evaluated at run time.
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `base.key` - the key is static.
    Member { base: Box<Expr>, key: Rc<str> },
    /// `target = value`; yields the written value.
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// `unset target` - removes the addressed element, yields its old value.
    Unset(Box<Expr>),
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// A unary operator application.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// A binary operator application.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Literal constants. Converted into runtime values during lowering.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(Rc<str>),
}

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not (operates on truthiness).
    Not,
}

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl BinaryOp {
    /// The operator spelling, used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
        }
    }
}
