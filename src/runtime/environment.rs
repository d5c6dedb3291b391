use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone)]
struct Binding {
    cell: Rc<RefCell<Value>>,
    mutable: bool,
}

/// Flat set of bindings visible to argument expressions at a call site.
#[derive(Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Binding>,
    moves: Vec<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, shadowing any earlier binding of the same name.
    pub fn declare(&mut self, name: &str, value: Value, mutable: bool) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                cell: Rc::new(RefCell::new(value)),
                mutable,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings
            .get(name)
            .map(|binding| binding.cell.borrow().clone())
    }

    pub fn get_cell(&self, name: &str) -> Option<(Rc<RefCell<Value>>, bool)> {
        self.bindings
            .get(name)
            .map(|binding| (binding.cell.clone(), binding.mutable))
    }

    /// Moves the value out of `name`, leaving the binding in the moved state.
    pub fn take(&mut self, name: &str) -> RuntimeResult<Value> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownSymbol {
                name: name.to_string(),
            })?;
        let mut slot = binding.cell.borrow_mut();
        if matches!(*slot, Value::Moved) {
            return Err(RuntimeError::MovedValue {
                name: name.to_string(),
            });
        }
        let moved = std::mem::replace(&mut *slot, Value::Moved);
        drop(slot);
        self.moves.push(name.to_string());
        Ok(moved)
    }

    pub fn is_moved(&self, name: &str) -> bool {
        self.bindings
            .get(name)
            .is_some_and(|binding| matches!(*binding.cell.borrow(), Value::Moved))
    }

    /// Names moved out so far, in move order.
    pub fn moves(&self) -> &[String] {
        &self.moves
    }
}
