//! Variable cells and the tracker the collector walks.
//!
//! A variable cell holds a value, an immutability flag and the location of
//! its declaration. Cells are reference-counted and jointly owned by the
//! tracker and by every live `Reference` pointing at them; the tracker's
//! table is the authority on whether a cell may be wiped when a reference
//! lets go.
//!
//! The tracing policy itself lives outside this crate. This module only
//! guarantees that "what do you reach" can be asked, via
//! [`VariableCallback`], and answered exhaustively.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rill_ir::SourceLocation;

use crate::value::Value;

/// The contents of one variable cell.
#[derive(Debug)]
struct Variable {
    value: Value,
    immutable: bool,
    decl: SourceLocation,
}

/// A shared handle to a variable cell.
///
/// This is a factory wrapper over `Rc<RefCell<..>>`: all cell allocations
/// go through [`VarCell::new`], and the interior is reachable only through
/// the accessors here. Single-threaded by construction.
#[derive(Clone)]
pub struct VarCell(Rc<RefCell<Variable>>);

impl VarCell {
    /// Allocate a new cell.
    pub fn new(decl: SourceLocation, value: Value, immutable: bool) -> Self {
        VarCell(Rc::new(RefCell::new(Variable {
            value,
            immutable,
            decl,
        })))
    }

    /// A clone of the stored value.
    pub fn value(&self) -> Value {
        self.0.borrow().value.clone()
    }

    /// Whether writes through this cell are rejected.
    pub fn is_immutable(&self) -> bool {
        self.0.borrow().immutable
    }

    /// Where the variable was declared or last reset.
    pub fn decl(&self) -> SourceLocation {
        self.0.borrow().decl.clone()
    }

    /// Reinitialize the cell, as variable declaration and `for each` key
    /// binding do.
    pub fn reset(&self, decl: SourceLocation, value: Value, immutable: bool) {
        let mut inner = self.0.borrow_mut();
        inner.value = value;
        inner.immutable = immutable;
        inner.decl = decl;
    }

    /// Run `f` over the stored value without cloning it.
    pub(crate) fn with_value<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.0.borrow().value)
    }

    /// Run `f` over the stored value mutably. Immutability is the caller's
    /// business: `Reference::open` checks it before coming here.
    pub(crate) fn open_value<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.0.borrow_mut().value)
    }

    /// Whether two handles address the same cell.
    pub fn ptr_eq(&self, other: &VarCell) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn use_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Visit every variable reachable from the stored value.
    pub fn enumerate_reachable(&self, callback: &mut dyn VariableCallback) {
        // Clone out first: the callback may read this very cell.
        let value = self.value();
        value.enumerate_reachable(callback);
    }
}

impl fmt::Debug for VarCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("VarCell")
            .field("value", &inner.value)
            .field("immutable", &inner.immutable)
            .field("decl", &inner.decl)
            .finish()
    }
}

/// The reachability callback handed to enumeration hooks.
///
/// Return `true` to descend into the accepted variable's own value graph.
/// A marking collector returns `true` the first time it sees a cell and
/// `false` afterwards, which keeps cyclic graphs terminating.
pub trait VariableCallback {
    fn accept(&mut self, cell: &VarCell) -> bool;
}

/// The table of every tracked variable cell.
///
/// `Reference::dispose` asks this table for permission before wiping a
/// cell: only a cell the tracker can unlist - one with no handle left
/// beyond the tracker's own entry and the caller's - may be cleared.
#[derive(Default)]
pub struct VariableTracker {
    cells: RefCell<Vec<VarCell>>,
}

impl VariableTracker {
    pub fn new() -> Self {
        VariableTracker::default()
    }

    /// Start tracking a cell.
    pub fn track(&self, cell: VarCell) {
        self.cells.borrow_mut().push(cell);
    }

    /// Unlist `cell` if nothing outside the tracker and the caller still
    /// holds it. Returns whether the cell was unlisted - the caller may
    /// wipe its contents only on `true`.
    pub fn untrack_unreachable(&self, cell: &VarCell) -> bool {
        let mut cells = self.cells.borrow_mut();
        let Some(pos) = cells.iter().position(|c| c.ptr_eq(cell)) else {
            return false;
        };
        // Two handles are accounted for: the table entry and the caller's.
        if cell.use_count() > 2 {
            return false;
        }
        cells.swap_remove(pos);
        true
    }

    /// Visit every tracked cell, descending where the callback asks to.
    pub fn enumerate(&self, callback: &mut dyn VariableCallback) {
        // Snapshot: the callback may allocate variables while we walk.
        let snapshot = self.cells.borrow().clone();
        for cell in &snapshot {
            if callback.accept(cell) {
                cell.enumerate_reachable(callback);
            }
        }
    }

    /// Number of tracked cells.
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Collecting {
        seen: Vec<VarCell>,
    }

    impl VariableCallback for Collecting {
        fn accept(&mut self, cell: &VarCell) -> bool {
            if self.seen.iter().any(|c| c.ptr_eq(cell)) {
                return false;
            }
            self.seen.push(cell.clone());
            true
        }
    }

    #[test]
    fn reset_replaces_value_and_flag() {
        let cell = VarCell::new(SourceLocation::new("t.rill", 1), Value::Null, false);
        assert!(!cell.is_immutable());

        cell.reset(SourceLocation::new("t.rill", 2), Value::Int(5), true);
        assert_eq!(cell.value(), Value::Int(5));
        assert!(cell.is_immutable());
        assert_eq!(cell.decl().line(), 2);
    }

    #[test]
    fn tracker_refuses_to_unlist_a_shared_cell() {
        let tracker = VariableTracker::new();
        let cell = VarCell::new(SourceLocation::new("t.rill", 1), Value::Int(1), false);
        tracker.track(cell.clone());

        let extra = cell.clone();
        assert!(!tracker.untrack_unreachable(&cell));
        drop(extra);
        assert!(tracker.untrack_unreachable(&cell));
        assert!(tracker.is_empty());

        // Already unlisted: a second dispose finds nothing.
        assert!(!tracker.untrack_unreachable(&cell));
    }

    #[test]
    fn enumeration_descends_into_nested_values() {
        let tracker = VariableTracker::new();
        let inner = VarCell::new(SourceLocation::new("t.rill", 1), Value::Int(1), false);
        tracker.track(inner.clone());
        let outer = VarCell::new(
            SourceLocation::new("t.rill", 2),
            Value::array(vec![Value::Int(0), Value::Null]),
            false,
        );
        tracker.track(outer.clone());

        let mut callback = Collecting { seen: Vec::new() };
        tracker.enumerate(&mut callback);
        assert_eq!(callback.seen.len(), 2);
    }
}
