//! References: the unified lvalue/rvalue abstraction.
//!
//! A reference is a *root* - a borrowed constant, an owned temporary, or a
//! handle to a variable cell - plus an ordered chain of navigation
//! modifiers applied lazily on dereference. Reading never fails on a
//! missing path (it yields null); writing requires a mutable root and
//! materializes intermediate containers; `zoom_in`/`zoom_out` grow and
//! shrink the chain in LIFO order so the lowering can address nested
//! elements without re-resolving from scratch.

mod modifier;

use smallvec::SmallVec;
use tracing::debug;

pub use modifier::Modifier;

use crate::error::{ErrorKind, RuntimeError};
use crate::global::GlobalContext;
use crate::value::Value;
use crate::variable::{VarCell, VariableCallback};

/// The base a reference resolves from.
#[derive(Clone, Debug)]
pub enum Root {
    /// An immutable value baked into compiled code.
    Constant(Value),
    /// An owned value computed by an expression.
    Temporary(Value),
    /// A shared handle to a mutable variable cell.
    Variable(VarCell),
}

/// A reference to a value, possibly navigated into.
#[derive(Clone, Debug)]
pub struct Reference {
    root: Root,
    modifiers: SmallVec<[Modifier; 4]>,
}

impl Reference {
    /// A reference to a constant value.
    pub fn constant(value: Value) -> Self {
        Reference {
            root: Root::Constant(value),
            modifiers: SmallVec::new(),
        }
    }

    /// A reference owning a temporary value.
    pub fn temporary(value: Value) -> Self {
        Reference {
            root: Root::Temporary(value),
            modifiers: SmallVec::new(),
        }
    }

    /// A reference to a variable cell.
    pub fn variable(cell: VarCell) -> Self {
        Reference {
            root: Root::Variable(cell),
            modifiers: SmallVec::new(),
        }
    }

    /// The constant null reference.
    pub fn null() -> Self {
        Reference::constant(Value::Null)
    }

    /// The root this reference resolves from.
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The variable cell behind this reference, if the root is one.
    pub fn variable_cell(&self) -> Option<&VarCell> {
        match &self.root {
            Root::Variable(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.root, Root::Temporary(_))
    }

    /// The navigation chain, outermost step last.
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Push one navigation step.
    pub fn zoom_in(&mut self, modifier: Modifier) -> &mut Self {
        self.modifiers.push(modifier);
        self
    }

    /// Pop the most recent navigation step.
    pub fn zoom_out(&mut self) -> Option<Modifier> {
        self.modifiers.pop()
    }

    /// Resolve the root and apply every modifier in order, yielding the
    /// addressed value. Missing steps yield null; navigating through a
    /// non-container value is a `TypeMismatch`.
    pub fn read(&self) -> Result<Value, RuntimeError> {
        match &self.root {
            Root::Constant(value) | Root::Temporary(value) => {
                modifier::read_path(value, &self.modifiers)
            }
            Root::Variable(cell) => {
                cell.with_value(|value| modifier::read_path(value, &self.modifiers))
            }
        }
    }

    /// Mutably dereference, materializing missing containers along the
    /// path, and run `f` on the addressed value.
    ///
    /// Fails with `ImmutableAccess` on a constant or temporary root, or on
    /// a variable flagged immutable; the message cites what was addressed.
    pub fn open<R>(&self, f: impl FnOnce(&mut Value) -> R) -> Result<R, RuntimeError> {
        let cell = self.writable_cell()?;
        cell.open_value(|value| {
            let target = modifier::open_path(value, &self.modifiers)?;
            Ok(f(target))
        })
    }

    /// Write `value` at the addressed location. See [`open`](Self::open).
    pub fn write(&self, value: Value) -> Result<(), RuntimeError> {
        self.open(|target| *target = value)
    }

    /// Remove the element addressed by the last modifier and return its
    /// prior value, or null when it addresses nothing. Intermediate misses
    /// behave as in [`read`](Self::read); the root must be writable.
    pub fn unset(&self) -> Result<Value, RuntimeError> {
        if self.modifiers.is_empty() {
            return Err(RuntimeError::type_mismatch(
                "only an array element or an object member can be unset, not a whole variable",
            ));
        }
        let cell = self.writable_cell()?;
        cell.open_value(|value| modifier::unset_path(value, &self.modifiers))
    }

    /// Rebuild this reference as a temporary owning the value it reads.
    pub fn to_temporary(&self) -> Result<Reference, RuntimeError> {
        Ok(Reference::temporary(self.read()?))
    }

    fn writable_cell(&self) -> Result<&VarCell, RuntimeError> {
        match &self.root {
            Root::Constant(value) => Err(RuntimeError::new(ErrorKind::ImmutableAccess {
                target: format!("the constant `{value}`"),
            })),
            Root::Temporary(value) => Err(RuntimeError::new(ErrorKind::ImmutableAccess {
                target: format!("the temporary value `{value}`"),
            })),
            Root::Variable(cell) => {
                if cell.is_immutable() {
                    return Err(RuntimeError::new(ErrorKind::ImmutableAccess {
                        target: format!("the immutable variable declared at {}", cell.decl()),
                    }));
                }
                Ok(cell)
            }
        }
    }

    /// Visit every variable reachable from this reference: the variable
    /// cell behind the root (descending when the callback asks), or the
    /// values nested in a constant/temporary root.
    pub fn enumerate_reachable(&self, callback: &mut dyn VariableCallback) {
        match &self.root {
            Root::Constant(value) | Root::Temporary(value) => {
                value.enumerate_reachable(callback);
            }
            Root::Variable(cell) => {
                if callback.accept(cell) {
                    cell.enumerate_reachable(callback);
                }
            }
        }
    }

    /// Best-effort cycle breaking when a variable reference goes out of
    /// use: if the tracker confirms the cell unreachable, wipe it to null
    /// so anything it retained is released promptly. The full guarantee
    /// belongs to the external collector, not this hook.
    pub fn dispose(&self, global: &GlobalContext) {
        if let Root::Variable(cell) = &self.root {
            if global.tracker().untrack_unreachable(cell) {
                debug!(decl = %cell.decl(), "disposing variable");
                cell.reset(cell.decl(), Value::Null, true);
            }
        }
    }
}

impl Default for Reference {
    fn default() -> Self {
        Reference::null()
    }
}
