use std::{cell::RefCell, collections::HashMap, rc::Rc};

use super::runtime::{RuntimeError, RuntimeErrorKind};
use super::value::Value;

/// Scopes are shared: a block or call frame holds its scope while it runs, and every closure created inside holds it
/// for as long as the function value is reachable
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope
/// The enclosing link is fixed at construction, so the chain can't cycle
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new_global() -> Environment {
        Environment::default()
    }

    pub fn new_enclosed(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing.clone()),
        }))
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind in this scope, replacing a previous binding here and shadowing any outer one
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name, line),
            None => Err(undefined(name, line)),
        }
    }

    /// Update the nearest existing binding
    /// Unlike define this never creates a binding, an unknown name is an error
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(lvalue) = self.values.get_mut(name) {
            *lvalue = value;
            return Ok(());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value, line),
            None => Err(undefined(name, line)),
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

fn undefined(name: &str, line: usize) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::UndefinedVariable(name.to_string()), line)
}
