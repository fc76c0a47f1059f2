//! Diagnostic formatting.
//!
//! `Display` is the compact single-line form used inside error messages.
//! [`Value::dump`] is the structured multi-line form for diagnostics; it is
//! deterministic (object keys are emitted sorted) but not required to be a
//! parseable literal.

use std::fmt;

use super::Value;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Opaque(opq) => write!(f, "<opaque {}>", opq.describe()),
            Value::Function(fun) => write!(f, "<function {}>", fun.describe()),
            Value::Array(arr) => {
                f.write_str("[")?;
                for (i, elem) in arr.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                f.write_str("]")
            }
            Value::Object(obj) => {
                let mut keys: Vec<_> = obj.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, key) in keys.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {}", obj[*key])?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name(), self)
    }
}

impl Value {
    /// Write the structured multi-line dump of this value.
    pub fn dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.dump_indented(out, 0)
    }

    /// The dump as a string, for convenience in logs and tests.
    pub fn dump_to_string(&self) -> String {
        let mut text = String::new();
        // Infallible: writing into a String cannot fail.
        let _ = self.dump(&mut text);
        text
    }

    fn dump_indented(&self, out: &mut impl fmt::Write, indent: usize) -> fmt::Result {
        const STEP: usize = 2;
        match self {
            Value::Null => out.write_str("null"),
            Value::Bool(b) => write!(out, "boolean {b}"),
            Value::Int(i) => write!(out, "integer {i}"),
            Value::Real(r) => write!(out, "real {r}"),
            Value::Str(s) => write!(out, "string({}) {s:?}", s.len()),
            Value::Opaque(opq) => write!(out, "opaque {:?}", opq.describe()),
            Value::Function(fun) => write!(out, "function {:?}", fun.describe()),
            Value::Array(arr) => {
                writeln!(out, "array({}) [", arr.len())?;
                let inner = indent + STEP;
                for (i, elem) in arr.iter().enumerate() {
                    write!(out, "{:inner$}{i} = ", "")?;
                    elem.dump_indented(out, inner)?;
                    writeln!(out, ";")?;
                }
                write!(out, "{:indent$}]", "")
            }
            Value::Object(obj) => {
                let mut keys: Vec<_> = obj.keys().collect();
                keys.sort();
                writeln!(out, "object({}) {{", obj.len())?;
                let inner = indent + STEP;
                for key in keys {
                    write!(out, "{:inner$}{key:?} = ", "")?;
                    obj[key].dump_indented(out, inner)?;
                    writeln!(out, ";")?;
                }
                write!(out, "{:indent$}}}", "")
            }
        }
    }
}
