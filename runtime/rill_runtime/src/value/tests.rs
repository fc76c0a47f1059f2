#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::error::ErrorKind;

use super::{compare_values, Compare, Value, Varray, Vobject, Vtype};

#[test]
fn type_names_match_the_alternatives() {
    assert_eq!(Value::Null.type_name(), "null");
    assert_eq!(Value::Bool(true).type_name(), "boolean");
    assert_eq!(Value::Int(0).type_name(), "integer");
    assert_eq!(Value::Real(0.0).type_name(), "real");
    assert_eq!(Value::string("").type_name(), "string");
    assert_eq!(Value::array(Varray::new()).type_name(), "array");
    assert_eq!(Value::object(Vobject::default()).type_name(), "object");
}

#[test]
fn opt_returns_the_alternative_or_nothing() {
    let v = Value::Int(12);
    assert_eq!(v.opt::<i64>(), Some(&12));
    assert_eq!(v.opt::<f64>(), None);
    assert_eq!(v.opt::<Rc<str>>(), None);
}

#[test]
fn check_reports_a_structural_mismatch() {
    let v = Value::string("hi");
    assert_eq!(*v.check::<Rc<str>>().unwrap(), Rc::<str>::from("hi"));
    let err = v.check::<i64>().unwrap_err();
    match err.kind() {
        ErrorKind::StructuralMismatch { expected, actual } => {
            assert_eq!(*expected, "integer");
            assert_eq!(*actual, "string");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn failed_check_mut_leaves_the_value_intact() {
    let mut v = Value::Bool(true);
    assert!(v.check_mut::<Varray>().is_err());
    assert_eq!(v, Value::Bool(true));
}

#[test]
fn mutating_an_array_in_place() {
    let mut v = Value::array(vec![Value::Int(1)]);
    v.check_mut::<Varray>().unwrap().push(Value::Int(2));
    assert_eq!(v, Value::array(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn set_replaces_whatever_was_there() {
    let mut v = Value::string("old");
    v.set(5i64);
    assert_eq!(v, Value::Int(5));
    v.set(());
    assert!(v.is_null());
}

#[test]
fn truthiness_of_each_alternative() {
    assert!(!Value::Null.test());
    assert!(!Value::Bool(false).test());
    assert!(Value::Bool(true).test());
    assert!(!Value::Int(0).test());
    assert!(Value::Int(-1).test());
    assert!(!Value::Real(0.0).test());
    assert!(!Value::Real(-0.0).test());
    assert!(!Value::Real(f64::NAN).test());
    assert!(Value::Real(0.25).test());
    assert!(!Value::string("").test());
    assert!(Value::string("x").test());
    assert!(!Value::array(Varray::new()).test());
    assert!(Value::array(vec![Value::Null]).test());
    assert!(!Value::object(Vobject::default()).test());
    let mut obj = Vobject::default();
    obj.insert("k".into(), Value::Null);
    assert!(Value::object(obj).test());
}

#[test]
fn comparison_orders_numbers_across_kinds() {
    assert_eq!(compare_values(&Value::Int(1), &Value::Real(1.5)), Compare::Less);
    assert_eq!(compare_values(&Value::Real(2.0), &Value::Int(2)), Compare::Equal);
    assert_eq!(
        compare_values(&Value::Real(f64::NAN), &Value::Real(f64::NAN)),
        Compare::Unordered
    );
    assert_eq!(
        compare_values(&Value::Int(1), &Value::string("1")),
        Compare::Unordered
    );
    assert_eq!(compare_values(&Value::Null, &Value::Null), Compare::Equal);
    assert_eq!(compare_values(&Value::Null, &Value::Int(0)), Compare::Unordered);
}

#[test]
fn arrays_compare_lexicographically() {
    let a = Value::array(vec![Value::Int(1), Value::Int(2)]);
    let b = Value::array(vec![Value::Int(1), Value::Int(3)]);
    let c = Value::array(vec![Value::Int(1)]);
    assert_eq!(compare_values(&a, &b), Compare::Less);
    assert_eq!(compare_values(&b, &a), Compare::Greater);
    assert_eq!(compare_values(&c, &a), Compare::Less);
    assert_eq!(compare_values(&a, &a.clone()), Compare::Equal);
}

#[test]
fn objects_are_equal_or_unordered() {
    let mut lhs = Vobject::default();
    lhs.insert("a".into(), Value::Int(1));
    lhs.insert("b".into(), Value::Int(2));
    let mut rhs = Vobject::default();
    rhs.insert("b".into(), Value::Int(2));
    rhs.insert("a".into(), Value::Int(1));
    assert_eq!(
        compare_values(&Value::object(lhs.clone()), &Value::object(rhs.clone())),
        Compare::Equal
    );
    rhs.insert("a".into(), Value::Int(9));
    assert_eq!(
        compare_values(&Value::object(lhs), &Value::object(rhs)),
        Compare::Unordered
    );
}

#[test]
fn strict_equality_never_mixes_kinds() {
    assert_ne!(Value::Int(1), Value::Real(1.0));
    assert_ne!(Value::Real(f64::NAN), Value::Real(f64::NAN));
    assert_eq!(Value::Real(1.0), Value::Real(1.0));
}

#[test]
fn display_is_compact() {
    let mut obj = Vobject::default();
    obj.insert("b".into(), Value::Bool(false));
    obj.insert("a".into(), Value::Null);
    let v = Value::array(vec![Value::Int(1), Value::string("s"), Value::object(obj)]);
    assert_eq!(v.to_string(), r#"[1, "s", {"a": null, "b": false}]"#);
}

#[test]
fn dump_is_annotated_and_deterministic() {
    let mut obj = Vobject::default();
    obj.insert("z".into(), Value::Int(1));
    obj.insert("a".into(), Value::Real(1.5));
    let v = Value::object(obj);
    let first = v.dump_to_string();
    let second = v.dump_to_string();
    assert_eq!(first, second);
    assert!(first.starts_with("object(2) {"));
    // Keys come out sorted regardless of insertion order.
    let a_at = first.find("\"a\"").unwrap();
    let z_at = first.find("\"z\"").unwrap();
    assert!(a_at < z_at);
}

#[test]
fn vtype_displays_its_name() {
    assert_eq!(Vtype::Array.to_string(), "array");
    assert_eq!(Value::Real(0.5).vtype(), Vtype::Real);
}
