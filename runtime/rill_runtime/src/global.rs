//! The global context shared by every executive context of one script
//! instance. Owns the variable tracker; the external collector drives
//! collection through it.

use rill_ir::SourceLocation;
use tracing::trace;

use crate::value::Value;
use crate::variable::{VarCell, VariableTracker};

/// Per-instance globals: currently the variable tracker.
#[derive(Default)]
pub struct GlobalContext {
    tracker: VariableTracker,
}

impl GlobalContext {
    pub fn new() -> Self {
        GlobalContext::default()
    }

    /// The tracker holding every variable this context has created.
    pub fn tracker(&self) -> &VariableTracker {
        &self.tracker
    }

    /// Allocate and track a fresh null variable.
    pub fn create_variable(&self, decl: SourceLocation) -> VarCell {
        trace!(decl = %decl, "creating variable");
        let cell = VarCell::new(decl, Value::Null, false);
        self.tracker.track(cell.clone());
        cell
    }
}
