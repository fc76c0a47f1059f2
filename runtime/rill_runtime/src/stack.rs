//! The evaluation stack of references.
//!
//! Compiled expressions communicate exclusively through this stack: each
//! executor pops its operands and pushes its result, and a statement
//! boundary clears whatever is left. Underflow is a lowering bug, not a
//! script error, so the accessors panic.

use crate::reference::Reference;

/// A LIFO stack of references.
#[derive(Default)]
pub struct ReferenceStack {
    refs: Vec<Reference>,
}

impl ReferenceStack {
    pub fn new() -> Self {
        ReferenceStack::default()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Drop everything, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.refs.clear();
    }

    pub fn push(&mut self, r: Reference) {
        self.refs.push(r);
    }

    #[track_caller]
    pub fn pop(&mut self) -> Reference {
        match self.refs.pop() {
            Some(r) => r,
            None => panic!("reference stack underflow"),
        }
    }

    /// Pop the topmost `count` references, oldest first.
    #[track_caller]
    pub fn pop_many(&mut self, count: usize) -> Vec<Reference> {
        assert!(count <= self.refs.len(), "reference stack underflow");
        self.refs.split_off(self.refs.len() - count)
    }

    /// Iterate over all live references, bottom first.
    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.refs.iter()
    }

    #[track_caller]
    pub fn top(&self) -> &Reference {
        match self.refs.last() {
            Some(r) => r,
            None => panic!("reference stack underflow"),
        }
    }

    #[track_caller]
    pub fn top_mut(&mut self) -> &mut Reference {
        match self.refs.last_mut() {
            Some(r) => r,
            None => panic!("reference stack underflow"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::reference::Reference;
    use crate::value::Value;

    use super::ReferenceStack;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = ReferenceStack::new();
        stack.push(Reference::temporary(Value::Int(1)));
        stack.push(Reference::temporary(Value::Int(2)));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().read().unwrap(), Value::Int(2));
        assert_eq!(stack.pop().read().unwrap(), Value::Int(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_many_preserves_operand_order() {
        let mut stack = ReferenceStack::new();
        for i in 0..4 {
            stack.push(Reference::temporary(Value::Int(i)));
        }
        let args = stack.pop_many(3);
        let vals: Vec<_> = args.iter().map(|r| r.read().unwrap()).collect();
        assert_eq!(vals, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn popping_an_empty_stack_panics() {
        ReferenceStack::new().pop();
    }
}
