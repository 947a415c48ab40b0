use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use tracing::debug;

use super::environment::{EnvRef, Environment};
use super::runtime::{Flow, Interpreter, RuntimeError, RuntimeErrorKind};
use super::value::Value;
use crate::ast::FunDecl;

/// Anything that can be invoked with `arity()` arguments
/// The interpreter checks the argument count before calling
pub trait Callable: Display {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError>;
}

pub type NativeFn = fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeErrorKind>;

#[derive(Clone)]
pub struct NativeFunc {
    pub name: &'static str,
    pub arity: usize,
    pub call: NativeFn,
}

impl Callable for NativeFunc {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        (self.call)(interpreter, args).map_err(|kind| RuntimeError::new(kind, line))
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("<native fn>")
    }
}

/// A function declared in the script
/// The closure is the scope that was current when the declaration ran, not the caller's scope
pub struct LoxFunction {
    declaration: Rc<FunDecl>,
    closure: EnvRef,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunDecl>, closure: EnvRef) -> LoxFunction {
        LoxFunction {
            declaration,
            closure,
        }
    }
}

impl Callable for LoxFunction {
    fn name(&self) -> &str {
        &self.declaration.name
    }

    fn arity(&self) -> usize {
        self.declaration.parameters.len()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(function = %self.declaration.name))]
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        _line: usize,
    ) -> Result<Value, RuntimeError> {
        let environment = Environment::new_enclosed(&self.closure);
        {
            let mut frame = environment.borrow_mut();
            for (parameter, value) in self.declaration.parameters.iter().zip(args) {
                frame.define(parameter, value);
            }
        }
        match interpreter.execute_function_body(&self.declaration.body, environment)? {
            Flow::Return(value) => {
                debug!(%value, "returned");
                Ok(value)
            }
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl Display for LoxFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name)
    }
}
