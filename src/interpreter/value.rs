use std::{
    fmt::{Debug, Display},
    ops::{Add, Div, Mul, Neg, Sub},
    rc::Rc,
};

use super::callable::Callable;
use super::runtime::RuntimeErrorKind;
use crate::ast::Literal;

#[derive(Clone)]
pub enum Value {
    String(Rc<String>),
    Number(f64),
    Bool(bool),
    Callable(Rc<dyn Callable>),
    Nil,
}

impl Value {
    /// nil and false are falsy, everything else (including 0 and "") is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Nil => false,
            _ => true,
        }
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::new(s.to_string()))
    }

    fn number_operands(self, rhs: Value) -> Result<(f64, f64), RuntimeErrorKind> {
        match (self, rhs) {
            (Value::Number(l), Value::Number(r)) => Ok((l, r)),
            _ => Err(RuntimeErrorKind::OperandsNotNumbers),
        }
    }

    pub fn less_than(self, rhs: Value) -> Result<Value, RuntimeErrorKind> {
        let (l, r) = self.number_operands(rhs)?;
        Ok(Value::Bool(l < r))
    }

    pub fn less_than_equal(self, rhs: Value) -> Result<Value, RuntimeErrorKind> {
        let (l, r) = self.number_operands(rhs)?;
        Ok(Value::Bool(l <= r))
    }

    pub fn greater_than(self, rhs: Value) -> Result<Value, RuntimeErrorKind> {
        let (l, r) = self.number_operands(rhs)?;
        Ok(Value::Bool(l > r))
    }

    pub fn greater_than_equal(self, rhs: Value) -> Result<Value, RuntimeErrorKind> {
        let (l, r) = self.number_operands(rhs)?;
        Ok(Value::Bool(l >= r))
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Value {
        match literal {
            Literal::Number(n) => Value::Number(n.into_inner()),
            Literal::String(s) => Value::string(s),
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Nil => Value::Nil,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "Value::String({:?})", s),
            Value::Number(n) => write!(f, "Value::Number({})", n),
            Value::Bool(b) => write!(f, "Value::Bool({})", b),
            Value::Nil => f.write_str("Value::Nil"),
            Value::Callable(func) => write!(f, "Value::Callable({})", func),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => f.write_str("nil"),
            Value::Callable(func) => write!(f, "{}", func),
        }
    }
}

// No coercion between types, NaN is not equal to itself and callables compare by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Nil, Self::Nil) => true,
            (Self::Callable(left), Self::Callable(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

// Starting here are convenience implementations to make the interpret loop easier
impl Add for Value {
    type Output = Result<Value, RuntimeErrorKind>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::String(l), Value::String(r)) => {
                let mut new = String::with_capacity(l.len() + r.len());
                new.push_str(&l);
                new.push_str(&r);
                Ok(Value::String(Rc::new(new)))
            }
            _ => Err(RuntimeErrorKind::InvalidAddOperands),
        }
    }
}

impl Sub for Value {
    type Output = Result<Value, RuntimeErrorKind>;

    fn sub(self, rhs: Self) -> Self::Output {
        let (l, r) = self.number_operands(rhs)?;
        Ok(Value::Number(l - r))
    }
}

impl Mul for Value {
    type Output = Result<Value, RuntimeErrorKind>;

    fn mul(self, rhs: Self) -> Self::Output {
        let (l, r) = self.number_operands(rhs)?;
        Ok(Value::Number(l * r))
    }
}

// Division by zero is IEEE: inf or NaN, never an error
impl Div for Value {
    type Output = Result<Value, RuntimeErrorKind>;

    fn div(self, rhs: Self) -> Self::Output {
        let (l, r) = self.number_operands(rhs)?;
        Ok(Value::Number(l / r))
    }
}

impl Neg for Value {
    type Output = Result<Value, RuntimeErrorKind>;

    fn neg(self) -> Self::Output {
        match self {
            Value::Number(n) => Ok(Value::Number(-n)),
            _ => Err(RuntimeErrorKind::OperandNotNumber),
        }
    }
}
