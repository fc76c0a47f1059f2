//! Three-way value comparison.
//!
//! The result is one of four outcomes; `Unordered` covers NaN and every
//! cross-kind pair except integer/real, which compare numerically. Arrays
//! compare lexicographically element by element, recursing; objects are
//! `Equal` only when their key sets match and every member compares
//! `Equal`, and `Unordered` otherwise.

use std::cmp::Ordering;
use std::rc::Rc;

use super::Value;

/// The four-way comparison outcome.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Compare {
    Unordered,
    Less,
    Equal,
    Greater,
}

fn from_ordering(ord: Ordering) -> Compare {
    match ord {
        Ordering::Less => Compare::Less,
        Ordering::Equal => Compare::Equal,
        Ordering::Greater => Compare::Greater,
    }
}

fn compare_reals(lhs: f64, rhs: f64) -> Compare {
    lhs.partial_cmp(&rhs).map_or(Compare::Unordered, from_ordering)
}

fn compare_arrays(lhs: &[Value], rhs: &[Value]) -> Compare {
    for (a, b) in lhs.iter().zip(rhs.iter()) {
        match compare_values(a, b) {
            Compare::Equal => {}
            other => return other,
        }
    }
    from_ordering(lhs.len().cmp(&rhs.len()))
}

/// Compare two values three ways.
pub fn compare_values(lhs: &Value, rhs: &Value) -> Compare {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => Compare::Equal,
        (Value::Bool(a), Value::Bool(b)) => from_ordering(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => from_ordering(a.cmp(b)),
        // Numeric comparison crosses the integer/real boundary.
        (Value::Int(a), Value::Real(b)) => compare_reals(*a as f64, *b),
        (Value::Real(a), Value::Int(b)) => compare_reals(*a, *b as f64),
        (Value::Real(a), Value::Real(b)) => compare_reals(*a, *b),
        (Value::Str(a), Value::Str(b)) => from_ordering(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => compare_arrays(a, b),
        (Value::Object(a), Value::Object(b)) => {
            if a.len() == b.len()
                && a.iter().all(|(key, av)| {
                    b.get(key)
                        .is_some_and(|bv| compare_values(av, bv) == Compare::Equal)
                })
            {
                Compare::Equal
            } else {
                Compare::Unordered
            }
        }
        (Value::Function(a), Value::Function(b)) => {
            if Rc::ptr_eq(a, b) {
                Compare::Equal
            } else {
                Compare::Unordered
            }
        }
        (Value::Opaque(a), Value::Opaque(b)) => {
            if Rc::ptr_eq(a, b) {
                Compare::Equal
            } else {
                Compare::Unordered
            }
        }
        _ => Compare::Unordered,
    }
}
