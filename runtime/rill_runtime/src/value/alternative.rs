//! Typed access to the alternatives of [`Value`].
//!
//! `Alternative` is sealed over exactly the nine payload types, so asking
//! for anything outside the closed set fails to compile rather than at run
//! time. Container alternatives hand out `&mut` through `Rc::make_mut`,
//! which is where copy-on-write happens.

use std::rc::Rc;

use super::{Callable, OpaqueObject, Value, Varray, Vobject, Vtype};

mod sealed {
    use super::{Callable, OpaqueObject, Varray, Vobject};
    use std::rc::Rc;

    pub trait Sealed {}

    impl Sealed for () {}
    impl Sealed for bool {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for Rc<str> {}
    impl Sealed for Rc<dyn OpaqueObject> {}
    impl Sealed for Rc<dyn Callable> {}
    impl Sealed for Varray {}
    impl Sealed for Vobject {}
}

/// One member of the closed alternative set of [`Value`].
pub trait Alternative: sealed::Sealed + Sized {
    /// The kind tag this alternative occupies.
    const VTYPE: Vtype;

    /// Borrow the payload when this alternative is active.
    fn from_ref(value: &Value) -> Option<&Self>;

    /// Mutably borrow the payload when this alternative is active.
    fn from_mut(value: &mut Value) -> Option<&mut Self>;

    /// Wrap the payload back into a value.
    fn into_value(self) -> Value;
}

impl Alternative for () {
    const VTYPE: Vtype = Vtype::Null;

    fn from_ref(value: &Value) -> Option<&Self> {
        match value {
            Value::Null => Some(&()),
            _ => None,
        }
    }

    fn from_mut(value: &mut Value) -> Option<&mut Self> {
        // Null carries no payload; there is nothing to hand out mutably.
        let _ = value;
        None
    }

    fn into_value(self) -> Value {
        Value::Null
    }
}

macro_rules! scalar_alternative {
    ($ty:ty, $variant:ident, $vtype:expr) => {
        impl Alternative for $ty {
            const VTYPE: Vtype = $vtype;

            fn from_ref(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(alt) => Some(alt),
                    _ => None,
                }
            }

            fn from_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    Value::$variant(alt) => Some(alt),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

scalar_alternative!(bool, Bool, Vtype::Boolean);
scalar_alternative!(i64, Int, Vtype::Integer);
scalar_alternative!(f64, Real, Vtype::Real);
scalar_alternative!(Rc<str>, Str, Vtype::Str);
scalar_alternative!(Rc<dyn OpaqueObject>, Opaque, Vtype::Opaque);
scalar_alternative!(Rc<dyn Callable>, Function, Vtype::Function);

impl Alternative for Varray {
    const VTYPE: Vtype = Vtype::Array;

    fn from_ref(value: &Value) -> Option<&Self> {
        match value {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    fn from_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Array(arr) => Some(Rc::make_mut(arr)),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::array(self)
    }
}

impl Alternative for Vobject {
    const VTYPE: Vtype = Vtype::Object;

    fn from_ref(value: &Value) -> Option<&Self> {
        match value {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    fn from_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Object(obj) => Some(Rc::make_mut(obj)),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::object(self)
    }
}
