//! Navigation modifiers and path application.
//!
//! A modifier is one step of a navigation chain: an array index or an
//! object key. Reading through a missing step yields null; reading through
//! a value that is not a container of the right shape is a type mismatch,
//! except null, which reads as "nothing here yet". Opening a path creates
//! the containers the chain demands.

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::value::{Value, Varray, Vobject};

/// One navigation step.
#[derive(Clone, Debug, PartialEq)]
pub enum Modifier {
    /// An array subscript; negative counts from the end (`-1` is the last
    /// element).
    ArrayIndex(i64),
    /// An object member key.
    ObjectKey(Rc<str>),
}

impl Modifier {
    fn mismatch(&self, value: &Value) -> RuntimeError {
        match self {
            Modifier::ArrayIndex(index) => RuntimeError::type_mismatch(format!(
                "attempt to subscript a value of type `{}` with integer `{index}`",
                value.type_name()
            )),
            Modifier::ObjectKey(key) => RuntimeError::type_mismatch(format!(
                "attempt to subscript a value of type `{}` with key `{key}`",
                value.type_name()
            )),
        }
    }

    /// Apply one step for reading. `Ok(None)` means the path goes nowhere:
    /// the read as a whole yields null.
    fn apply_read<'a>(&self, value: &'a Value) -> Result<Option<&'a Value>, RuntimeError> {
        match (self, value) {
            (_, Value::Null) => Ok(None),
            (Modifier::ArrayIndex(index), Value::Array(arr)) => {
                Ok(resolve_index(*index, arr.len()).and_then(|at| arr.get(at)))
            }
            (Modifier::ObjectKey(key), Value::Object(obj)) => Ok(obj.get(&**key)),
            _ => Err(self.mismatch(value)),
        }
    }

    /// Apply one step for writing, materializing containers as needed.
    fn apply_open<'a>(&self, value: &'a mut Value) -> Result<&'a mut Value, RuntimeError> {
        if value.is_null() {
            *value = match self {
                Modifier::ArrayIndex(_) => Value::array(Varray::new()),
                Modifier::ObjectKey(_) => Value::object(Vobject::default()),
            };
        }
        match (self, &mut *value) {
            (Modifier::ArrayIndex(index), Value::Array(rc)) => {
                let arr = Rc::make_mut(rc);
                let at = match resolve_index(*index, arr.len()) {
                    Some(at) if at < arr.len() => at,
                    Some(at) => {
                        // Positive overshoot: pad with nulls so the index
                        // becomes addressable.
                        arr.resize(at + 1, Value::Null);
                        at
                    }
                    None => {
                        // Below the front: append at the end.
                        arr.push(Value::Null);
                        arr.len() - 1
                    }
                };
                Ok(&mut arr[at])
            }
            (Modifier::ObjectKey(key), Value::Object(rc)) => {
                Ok(Rc::make_mut(rc).entry(key.clone()).or_insert(Value::Null))
            }
            (_, other) => Err(self.mismatch(other)),
        }
    }

    /// Apply one intermediate step for unsetting: mutable navigation that
    /// never materializes anything.
    fn apply_peek_mut<'a>(
        &self,
        value: &'a mut Value,
    ) -> Result<Option<&'a mut Value>, RuntimeError> {
        match (self, &mut *value) {
            (_, Value::Null) => Ok(None),
            (Modifier::ArrayIndex(index), Value::Array(rc)) => {
                let arr = Rc::make_mut(rc);
                let len = arr.len();
                Ok(resolve_index(*index, len).and_then(move |at| arr.get_mut(at)))
            }
            (Modifier::ObjectKey(key), Value::Object(rc)) => {
                Ok(Rc::make_mut(rc).get_mut(&**key))
            }
            (_, other) => Err(self.mismatch(other)),
        }
    }

    /// Remove and return the element this step addresses, or null when it
    /// addresses nothing.
    fn apply_erase(&self, value: &mut Value) -> Result<Value, RuntimeError> {
        match (self, &mut *value) {
            (_, Value::Null) => Ok(Value::Null),
            (Modifier::ArrayIndex(index), Value::Array(rc)) => {
                let arr = Rc::make_mut(rc);
                match resolve_index(*index, arr.len()) {
                    Some(at) if at < arr.len() => Ok(arr.remove(at)),
                    _ => Ok(Value::Null),
                }
            }
            (Modifier::ObjectKey(key), Value::Object(rc)) => {
                Ok(Rc::make_mut(rc).remove(&**key).unwrap_or(Value::Null))
            }
            (_, other) => Err(self.mismatch(other)),
        }
    }
}

/// Resolve a possibly-negative index against a length. `None` means the
/// index lies below the front of the array.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        // A nonnegative index is valid even past the end; the caller
        // decides whether to pad or to treat it as absent.
        usize::try_from(index).ok()
    } else {
        let back = index.checked_add_unsigned(len as u64)?;
        usize::try_from(back).ok()
    }
}

/// Read through a whole modifier chain, cloning the final value.
pub(crate) fn read_path(value: &Value, modifiers: &[Modifier]) -> Result<Value, RuntimeError> {
    let mut cursor = value;
    for modifier in modifiers {
        match modifier.apply_read(cursor)? {
            Some(next) => cursor = next,
            None => return Ok(Value::Null),
        }
    }
    Ok(cursor.clone())
}

/// Open a whole modifier chain for writing, materializing as needed.
pub(crate) fn open_path<'a>(
    value: &'a mut Value,
    modifiers: &[Modifier],
) -> Result<&'a mut Value, RuntimeError> {
    let mut cursor = value;
    for modifier in modifiers {
        cursor = modifier.apply_open(cursor)?;
    }
    Ok(cursor)
}

/// Remove the element addressed by the last modifier, returning its prior
/// value. The chain must be nonempty; the caller checks.
pub(crate) fn unset_path(value: &mut Value, modifiers: &[Modifier]) -> Result<Value, RuntimeError> {
    let (last, leading) = modifiers
        .split_last()
        .unwrap_or_else(|| unreachable!("unset_path requires a nonempty modifier chain"));
    let mut cursor = value;
    for modifier in leading {
        match modifier.apply_peek_mut(cursor)? {
            Some(next) => cursor = next,
            None => return Ok(Value::Null),
        }
    }
    last.apply_erase(cursor)
}
