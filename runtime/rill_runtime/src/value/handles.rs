//! Host-object and function handle traits.
//!
//! Opaque objects are how an embedder smuggles native state through script
//! values. Functions are anything invocable: instantiated script functions
//! or native bindings supplied by the host. Both must answer the
//! reachability question so the collector can trace through them.

use crate::error::RuntimeError;
use crate::global::GlobalContext;
use crate::reference::Reference;
use crate::variable::VariableCallback;

/// A host object carried opaquely inside a value.
pub trait OpaqueObject {
    /// A short human-readable description for diagnostics.
    fn describe(&self) -> String;

    /// Visit every variable reachable from this object.
    ///
    /// The default reaches nothing; hosts embedding references must
    /// override this or the collector will reclaim under them.
    fn enumerate_reachable(&self, callback: &mut dyn VariableCallback) {
        let _ = callback;
    }
}

/// Anything a script can call.
pub trait Callable {
    /// A short human-readable description for diagnostics, conventionally
    /// the function signature.
    fn describe(&self) -> String;

    /// Invoke with the given argument references, producing a result
    /// reference.
    fn invoke(
        &self,
        global: &GlobalContext,
        args: Vec<Reference>,
    ) -> Result<Reference, RuntimeError>;

    /// Visit every variable reachable from this function.
    fn enumerate_reachable(&self, callback: &mut dyn VariableCallback);
}
