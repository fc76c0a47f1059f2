//! Executive contexts: the mutable state a queue executes against.
//!
//! An executive owns the evaluation stack and a stack of lexical scopes,
//! each mapping names to references. Name lookup walks the scopes
//! innermost-out and yields a *clone* of the stored reference, so the
//! caller navigates and dereferences without holding a borrow into the
//! scope map. [`Executive::scoped`] returns an RAII guard that pops the
//! scope on drop, which keeps early `?` returns from leaking scopes.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::global::GlobalContext;
use crate::reference::Reference;
use crate::stack::ReferenceStack;
use crate::variable::VariableCallback;

/// The execution context of one function activation.
pub struct Executive<'g> {
    global: &'g GlobalContext,
    scopes: Vec<FxHashMap<Rc<str>, Reference>>,
    stack: ReferenceStack,
    func: Rc<str>,
}

impl<'g> Executive<'g> {
    /// A fresh context with one (outermost) scope.
    pub fn new(global: &'g GlobalContext, func: impl Into<Rc<str>>) -> Self {
        Executive {
            global,
            scopes: vec![FxHashMap::default()],
            stack: ReferenceStack::new(),
            func: func.into(),
        }
    }

    pub fn global(&self) -> &'g GlobalContext {
        self.global
    }

    /// The signature of the enclosing function, for diagnostics.
    pub fn func(&self) -> &Rc<str> {
        &self.func
    }

    pub fn stack(&mut self) -> &mut ReferenceStack {
        &mut self.stack
    }

    /// Bind `name` in the innermost scope, shadowing any outer binding.
    pub fn define(&mut self, name: Rc<str>, reference: Reference) {
        // A fresh context always holds its outermost scope.
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, reference);
        }
    }

    /// Look `name` up through the scope chain, innermost first.
    pub fn lookup(&self, name: &str) -> Option<Reference> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    /// Enter a nested scope; the guard pops it when dropped.
    pub fn scoped(&mut self) -> ScopedExecutive<'_, 'g> {
        self.scopes.push(FxHashMap::default());
        ScopedExecutive { ctx: self }
    }

    /// Visit every variable reachable from any scope or the stack.
    pub fn enumerate_reachable(&self, callback: &mut dyn VariableCallback) {
        for scope in &self.scopes {
            for reference in scope.values() {
                reference.enumerate_reachable(callback);
            }
        }
        for reference in self.stack.iter() {
            reference.enumerate_reachable(callback);
        }
    }
}

/// RAII guard over a nested scope. Derefs to the underlying executive.
pub struct ScopedExecutive<'a, 'g> {
    ctx: &'a mut Executive<'g>,
}

impl<'g> Deref for ScopedExecutive<'_, 'g> {
    type Target = Executive<'g>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for ScopedExecutive<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for ScopedExecutive<'_, '_> {
    fn drop(&mut self) {
        // Dispose variables declared in this scope before unbinding them.
        if let Some(scope) = self.ctx.scopes.pop() {
            for reference in scope.values() {
                reference.dispose(self.ctx.global);
            }
        }
    }
}
