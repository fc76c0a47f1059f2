//! Script functions instantiated from lowered bodies.

use std::rc::Rc;

use rill_ir::SourceLocation;

use crate::avmc::AvmcQueue;
use crate::context::Executive;
use crate::error::RuntimeError;
use crate::global::GlobalContext;
use crate::reference::Reference;
use crate::status::Status;
use crate::value::{Callable, Value};
use crate::variable::VariableCallback;

/// A function whose body has been lowered into an instruction queue.
///
/// Functions do not capture enclosing locals; an activation sees only its
/// parameters and whatever it declares itself.
pub struct InstantiatedFunction {
    sloc: SourceLocation,
    signature: Rc<str>,
    params: Box<[Rc<str>]>,
    body: AvmcQueue,
}

impl InstantiatedFunction {
    pub fn new(
        sloc: SourceLocation,
        signature: impl Into<Rc<str>>,
        params: Vec<Rc<str>>,
        body: AvmcQueue,
    ) -> Self {
        InstantiatedFunction {
            sloc,
            signature: signature.into(),
            params: params.into_boxed_slice(),
            body,
        }
    }

    pub fn sloc(&self) -> &SourceLocation {
        &self.sloc
    }
}

impl Callable for InstantiatedFunction {
    fn describe(&self) -> String {
        format!("{} defined at {}", self.signature, self.sloc)
    }

    fn invoke(
        &self,
        global: &GlobalContext,
        args: Vec<Reference>,
    ) -> Result<Reference, RuntimeError> {
        let mut ctx = Executive::new(global, self.signature.clone());

        // Bind each parameter to a fresh variable holding the argument's
        // value; missing arguments read as null, excess ones are dropped.
        let mut args = args.into_iter();
        for param in self.params.iter() {
            let value = match args.next() {
                Some(arg) => arg.read()?,
                None => Value::Null,
            };
            let cell = global.create_variable(self.sloc.clone());
            cell.reset(self.sloc.clone(), value, false);
            ctx.define(param.clone(), Reference::variable(cell));
        }

        let status = self.body.execute(&mut ctx).map_err(|mut err| {
            err.push_frame(self.sloc.clone(), self.signature.to_string());
            err
        })?;
        match status {
            Status::Return if !ctx.stack().is_empty() => Ok(ctx.stack().pop()),
            Status::Next | Status::Return => Ok(Reference::null()),
            other => panic!("stray control-flow status {other:?} escaped a function body"),
        }
    }

    fn enumerate_reachable(&self, callback: &mut dyn VariableCallback) {
        self.body.enumerate_reachable(callback);
    }
}
