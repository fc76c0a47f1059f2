//! Runtime values.
//!
//! A `Value` holds exactly one of the nine Rill kinds. The enum is the
//! discriminated container itself: Rust's sum types give the "never
//! valueless, exactly one alternative live" invariant for free, and an
//! exhaustive `match` is the visitation surface.
//!
//! Strings are immutable and structurally shared. Arrays and objects are
//! shared too, and copied on first mutable access (`Rc::make_mut`), which
//! preserves value semantics: two values never observe each other's
//! mutations.

mod alternative;
mod compare;
mod dump;
mod handles;
#[cfg(test)]
mod tests;

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

pub use alternative::Alternative;
pub use compare::{compare_values, Compare};
pub use handles::{Callable, OpaqueObject};

use crate::error::{ErrorKind, RuntimeError};
use crate::variable::VariableCallback;

/// Array storage: an ordered sequence of values.
pub type Varray = Vec<Value>;

/// Object storage: a mapping from string keys to values. Lookup order is
/// irrelevant; diagnostic dumps sort keys to stay deterministic.
pub type Vobject = FxHashMap<Rc<str>, Value>;

/// A dynamically-typed Rill value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(Rc<str>),
    Opaque(Rc<dyn OpaqueObject>),
    Function(Rc<dyn Callable>),
    Array(Rc<Varray>),
    Object(Rc<Vobject>),
}

/// The kind tag of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Vtype {
    Null,
    Boolean,
    Integer,
    Real,
    Str,
    Opaque,
    Function,
    Array,
    Object,
}

impl Vtype {
    /// The name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Vtype::Null => "null",
            Vtype::Boolean => "boolean",
            Vtype::Integer => "integer",
            Vtype::Real => "real",
            Vtype::Str => "string",
            Vtype::Opaque => "opaque",
            Vtype::Function => "function",
            Vtype::Array => "array",
            Vtype::Object => "object",
        }
    }
}

impl fmt::Display for Vtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Create an array value.
    #[inline]
    pub fn array(items: Varray) -> Self {
        Value::Array(Rc::new(items))
    }

    /// Create an object value.
    #[inline]
    pub fn object(entries: Vobject) -> Self {
        Value::Object(Rc::new(entries))
    }

    /// Create an opaque host-object value.
    #[inline]
    pub fn opaque(handle: Rc<dyn OpaqueObject>) -> Self {
        Value::Opaque(handle)
    }

    /// Create a function value.
    #[inline]
    pub fn function(handle: Rc<dyn Callable>) -> Self {
        Value::Function(handle)
    }

    /// The kind tag. O(1).
    pub fn vtype(&self) -> Vtype {
        match self {
            Value::Null => Vtype::Null,
            Value::Bool(_) => Vtype::Boolean,
            Value::Int(_) => Vtype::Integer,
            Value::Real(_) => Vtype::Real,
            Value::Str(_) => Vtype::Str,
            Value::Opaque(_) => Vtype::Opaque,
            Value::Function(_) => Vtype::Function,
            Value::Array(_) => Vtype::Array,
            Value::Object(_) => Vtype::Object,
        }
    }

    /// The kind name, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.vtype().name()
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A view of the active alternative, or `None` when the active
    /// alternative is some other kind.
    #[inline]
    pub fn opt<T: Alternative>(&self) -> Option<&T> {
        T::from_ref(self)
    }

    /// Mutable counterpart of [`opt`](Value::opt). Arrays and objects are
    /// copied on first mutable access when shared.
    #[inline]
    pub fn opt_mut<T: Alternative>(&mut self) -> Option<&mut T> {
        T::from_mut(self)
    }

    /// The active alternative, or a `StructuralMismatch` error citing the
    /// expected and actual kind names.
    pub fn check<T: Alternative>(&self) -> Result<&T, RuntimeError> {
        let actual = self.vtype();
        T::from_ref(self).ok_or_else(|| {
            RuntimeError::new(ErrorKind::StructuralMismatch {
                expected: T::VTYPE.name(),
                actual: actual.name(),
            })
        })
    }

    /// Mutable counterpart of [`check`](Value::check). On mismatch the
    /// value is left untouched.
    pub fn check_mut<T: Alternative>(&mut self) -> Result<&mut T, RuntimeError> {
        let actual = self.vtype();
        T::from_mut(self).ok_or_else(|| {
            RuntimeError::new(ErrorKind::StructuralMismatch {
                expected: T::VTYPE.name(),
                actual: actual.name(),
            })
        })
    }

    /// Replace the active alternative with `alt`, whatever the current
    /// kind. In Rust this is ordinary assignment: the old alternative drops
    /// and the value is never left without one.
    #[inline]
    pub fn set<T: Alternative>(&mut self, alt: T) {
        *self = alt.into_value();
    }

    /// Truthiness.
    ///
    /// Null is false; booleans are themselves; numbers are true when
    /// nonzero (NaN is false); strings, arrays and objects are true when
    /// nonempty; functions and opaques are always true.
    pub fn test(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Real(r) => *r != 0.0 && !r.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(obj) => !obj.is_empty(),
            Value::Opaque(_) | Value::Function(_) => true,
        }
    }

    /// Three-way comparison with another value. See [`compare_values`].
    #[inline]
    pub fn compare(&self, other: &Value) -> Compare {
        compare_values(self, other)
    }

    /// Visit every variable reachable from this value.
    ///
    /// Arrays and objects descend into their elements; functions and
    /// opaques delegate to their own hooks. Scalars reach nothing.
    pub fn enumerate_reachable(&self, callback: &mut dyn VariableCallback) {
        match self {
            Value::Array(arr) => {
                for elem in arr.iter() {
                    elem.enumerate_reachable(callback);
                }
            }
            Value::Object(obj) => {
                for elem in obj.values() {
                    elem.enumerate_reachable(callback);
                }
            }
            Value::Function(fun) => fun.enumerate_reachable(callback),
            Value::Opaque(opq) => opq.enumerate_reachable(callback),
            _ => {}
        }
    }
}

impl Default for Value {
    /// The default value is `null`, alternative zero.
    fn default() -> Self {
        Value::Null
    }
}

/// Strict same-kind equality, used by tests and diagnostics.
///
/// Script-level equality goes through [`compare_values`], which also
/// relates integers to reals; this impl never crosses kinds. NaN is not
/// equal to itself. Functions and opaques compare by handle identity.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}
