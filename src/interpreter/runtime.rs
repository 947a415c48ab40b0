use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use super::callable::LoxFunction;
use super::environment::{EnvRef, Environment};
use super::print_handler::PrintHandler;
use super::value::Value;
use crate::ast::{BinaryOp, Expr, ExprInner, LogicalOp, Program, Stmt, UnaryOp};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandNotNumber,
    #[error("Operands must be numbers.")]
    OperandsNotNumbers,
    #[error("Operands must be two numbers or two strings.")]
    InvalidAddOperands,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },
    #[error("Can't return from top-level code.")]
    ReturnOutsideFunction,
    #[error("{0}")]
    Native(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}\n[line {line}]")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: usize) -> RuntimeError {
        RuntimeError { kind, line }
    }
}

/// How a statement finished
/// A `return` travels outward as `Flow::Return` until the enclosing call consumes it
#[derive(Debug, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    print_handler: PrintHandler,
    // Number of user function bodies currently executing
    function_depth: usize,
}

impl Interpreter {
    pub fn new_from_global(global_env: Environment, print_handler: PrintHandler) -> Interpreter {
        let globals = global_env.into_ref();
        Interpreter {
            environment: globals.clone(),
            globals,
            print_handler,
            function_depth: 0,
        }
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    pub fn print_handler_mut(&mut self) -> &mut PrintHandler {
        &mut self.print_handler
    }

    /// Run every statement in order, stopping at the first runtime error
    /// Global definitions made before the error stay in place
    #[tracing::instrument(level = "debug", skip_all, fields(statements = program.0.len()))]
    pub fn interpret(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for stmt in &program.0 {
            if let Err(err) = self.execute(stmt) {
                debug!(line = err.line, error = %err.kind, "runtime error");
                // A failure deep inside a call leaves nothing half-unwound for the next run
                self.environment = self.globals.clone();
                self.function_depth = 0;
                return Err(err);
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print(expr) => {
                let value = self.eval(expr)?;
                self.print_handler.println(&value.to_string());
                Ok(Flow::Normal)
            }
            Stmt::VarDecl { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(name, value);
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => {
                let environment = Environment::new_enclosed(&self.environment);
                self.execute_block(stmts, environment)
            }
            Stmt::If {
                expr,
                then,
                or_else,
            } => {
                if self.eval(expr)?.is_truthy() {
                    self.execute(then)
                } else if let Some(or_else) = or_else {
                    self.execute(or_else)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { expr, body } => {
                while self.eval(expr)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::FunDecl(declaration) => {
                // The function is bound in the scope it captures, an Rc cycle that keeps the scope alive
                // for the rest of the session even once nothing can reach the function
                let function = LoxFunction::new(declaration.clone(), self.environment.clone());
                self.environment
                    .borrow_mut()
                    .define(&declaration.name, Value::Callable(Rc::new(function)));
                Ok(Flow::Normal)
            }
            Stmt::Return { line, expr } => {
                if self.function_depth == 0 {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::ReturnOutsideFunction,
                        *line,
                    ));
                }
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Execute `stmts` with `environment` as the current scope
    /// The previous scope is restored whether the block completes, returns or fails
    pub fn execute_block(
        &mut self,
        stmts: &[Stmt],
        environment: EnvRef,
    ) -> Result<Flow, RuntimeError> {
        trace!("entering scope");
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_stmts(stmts);
        self.environment = previous;
        result
    }

    fn execute_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    pub(super) fn execute_function_body(
        &mut self,
        body: &[Stmt],
        environment: EnvRef,
    ) -> Result<Flow, RuntimeError> {
        self.function_depth += 1;
        let result = self.execute_block(body, environment);
        self.function_depth -= 1;
        result
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let line = expr.line;
        match &expr.inner {
            ExprInner::Literal(literal) => Ok(Value::from(literal)),
            ExprInner::Group(expr) => self.eval(expr),
            ExprInner::Unary { op, expr } => {
                let value = self.eval(expr)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Negative => (-value).map_err(|kind| RuntimeError::new(kind, line)),
                }
            }
            ExprInner::Binary { left, op, right } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                let result = match op {
                    BinaryOp::Equal => Ok(Value::Bool(lhs == rhs)),
                    BinaryOp::NotEqual => Ok(Value::Bool(lhs != rhs)),
                    BinaryOp::LessThan => lhs.less_than(rhs),
                    BinaryOp::LessThanEqual => lhs.less_than_equal(rhs),
                    BinaryOp::GreaterThan => lhs.greater_than(rhs),
                    BinaryOp::GreaterThanEqual => lhs.greater_than_equal(rhs),
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Subtract => lhs - rhs,
                    BinaryOp::Multiply => lhs * rhs,
                    BinaryOp::Divide => lhs / rhs,
                };
                result.map_err(|kind| RuntimeError::new(kind, line))
            }
            // Both operators hand back an operand rather than a coerced boolean
            ExprInner::Logical { left, op, right } => {
                let left = self.eval(left)?;
                match op {
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    _ => self.eval(right),
                }
            }
            ExprInner::Variable { name } => self.environment.borrow().get(name, line),
            ExprInner::Assignment { target, expr } => {
                let value = self.eval(expr)?;
                self.environment
                    .borrow_mut()
                    .assign(target, value.clone(), line)?;
                Ok(value)
            }
            ExprInner::Call { callee, arguments } => {
                let callee = self.eval(callee)?;
                let Value::Callable(callable) = callee else {
                    return Err(RuntimeError::new(RuntimeErrorKind::NotCallable, line));
                };
                let args = arguments
                    .iter()
                    .map(|expr| self.eval(expr))
                    .collect::<Result<Vec<_>, _>>()?;
                if args.len() != callable.arity() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::ArityMismatch {
                            expected: callable.arity(),
                            got: args.len(),
                        },
                        line,
                    ));
                }
                debug!(callee = callable.name(), arguments = args.len(), "call");
                callable.call(self, args, line)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::interpreter::stock_interpreter;
    use crate::parser::parse;
    use crate::reporter::CollectingReporter;
    use crate::scanner::scan;

    fn run(source: &str) -> (Vec<String>, Result<(), RuntimeError>) {
        let mut reporter = CollectingReporter::new();
        let tokens = scan(&mut reporter, source);
        let program = parse(&mut reporter, tokens).expect("program should parse");
        let mut interpreter = stock_interpreter(PrintHandler::buffer());
        let result = interpreter.interpret(&program);
        (interpreter.print_handler_mut().take(), result)
    }

    fn printed(source: &str) -> Vec<String> {
        let (lines, result) = run(source);
        result.expect("program should not fail");
        lines
    }

    fn failure(source: &str) -> RuntimeError {
        run(source).1.expect_err("program should fail")
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(vec!["7"], printed("print 1 + 2 * 3;"));
        assert_eq!(vec!["9"], printed("print (1 + 2) * 3;"));
        assert_eq!(vec!["-1"], printed("print 1 - 2;"));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(vec!["foobar"], printed("print \"foo\" + \"bar\";"));
    }

    #[test]
    fn uninitialized_var_is_nil() {
        assert_eq!(vec!["nil"], printed("var a; print a;"));
    }

    #[test]
    fn block_scopes_shadow_and_restore() {
        assert_eq!(
            vec!["2", "1"],
            printed("var a = 1; { var a = 2; print a; } print a;")
        );
    }

    #[test]
    fn assignment_reaches_enclosing_scope() {
        assert_eq!(vec!["2"], printed("var a = 1; { a = 2; } print a;"));
        assert_eq!(vec!["3", "3"], printed("var a; var b; a = b = 3; print a; print b;"));
    }

    #[test]
    fn if_else_and_while() {
        assert_eq!(vec!["yes"], printed("if (0) print \"yes\"; else print \"no\";"));
        assert_eq!(vec!["no"], printed("if (nil) print \"yes\"; else print \"no\";"));
        assert_eq!(
            vec!["0", "1", "2"],
            printed("var i = 0; while (i < 3) { print i; i = i + 1; }")
        );
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(
            vec!["hi", "nil", "yes", "false"],
            printed(
                "print nil or \"hi\"; print nil and \"no\"; print 1 and \"yes\"; print false or false;"
            )
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        // The right operand would fail if evaluated
        assert_eq!(vec!["true"], printed("print true or undefined;"));
        assert_eq!(vec!["false"], printed("print false and undefined;"));
    }

    #[test]
    fn equality() {
        assert_eq!(
            vec!["true", "false", "false", "true"],
            printed("print nil == nil; print nil == false; print 1 == \"1\"; print \"a\" != \"b\";")
        );
    }

    #[test]
    fn functions_and_returns() {
        assert_eq!(
            vec!["3", "nil", "<fn add>"],
            printed(
                "fun add(a, b) { return a + b; } print add(1, 2); \
                 fun nothing() {} print nothing(); print add;"
            )
        );
    }

    #[test]
    fn return_unwinds_through_loops() {
        assert_eq!(
            vec!["3"],
            printed(
                "fun find() { var i = 0; while (true) { if (i == 3) return i; i = i + 1; } } print find();"
            )
        );
    }

    #[test]
    fn closures_capture_their_scope() {
        assert_eq!(
            vec!["1", "2"],
            printed(
                "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; } \
                 var c = make(); print c(); print c();"
            )
        );
    }

    #[test]
    fn runtime_error_kinds_and_lines() {
        let err = failure("print -\"a\";");
        assert_eq!(RuntimeErrorKind::OperandNotNumber, err.kind);

        let err = failure("\n1 < \"a\";");
        assert_eq!(RuntimeErrorKind::OperandsNotNumbers, err.kind);
        assert_eq!(2, err.line);

        let err = failure("1 + nil;");
        assert_eq!(RuntimeErrorKind::InvalidAddOperands, err.kind);

        let err = failure("\"not a function\"();");
        assert_eq!(RuntimeErrorKind::NotCallable, err.kind);

        let err = failure("return 1;");
        assert_eq!(RuntimeErrorKind::ReturnOutsideFunction, err.kind);
    }

    #[test]
    fn arity_is_checked() {
        let err = failure("fun f(a, b) {}\nf(1);");
        assert_eq!(
            RuntimeErrorKind::ArityMismatch {
                expected: 2,
                got: 1
            },
            err.kind
        );
        assert_eq!(2, err.line);
        assert_eq!("Expected 2 arguments but got 1.\n[line 2]", err.to_string());
    }

    #[test]
    fn execution_stops_at_first_error() {
        let (lines, result) = run("print 1; print missing; print 2;");
        assert_eq!(vec!["1"], lines);
        assert_eq!(
            RuntimeErrorKind::UndefinedVariable("missing".to_string()),
            result.unwrap_err().kind
        );
    }

    #[test]
    fn scope_is_restored_after_error_in_call() {
        let mut reporter = CollectingReporter::new();
        let mut interpreter = stock_interpreter(PrintHandler::buffer());
        let tokens = scan(
            &mut reporter,
            "var a = \"global\"; fun f() { var a = \"local\"; nil(); } f();",
        );
        let failing = parse(&mut reporter, tokens).unwrap();
        assert!(interpreter.interpret(&failing).is_err());
        let tokens = scan(&mut reporter, "print a;");
        let after = parse(&mut reporter, tokens).unwrap();
        interpreter.interpret(&after).unwrap();
        assert_eq!(vec!["global"], interpreter.print_handler_mut().take());
    }

    #[test]
    fn declared_function_holds_its_scope() {
        let mut reporter = CollectingReporter::new();
        let mut interpreter = stock_interpreter(PrintHandler::Silent);
        let before = Rc::strong_count(interpreter.globals());
        let tokens = scan(&mut reporter, "fun f() {} fun g() {}");
        let program = parse(&mut reporter, tokens).unwrap();
        interpreter.interpret(&program).unwrap();
        // One captured reference per declared function
        assert_eq!(before + 2, Rc::strong_count(interpreter.globals()));
    }

    #[test]
    fn clock_is_a_native() {
        assert_eq!(vec!["<native fn>", "true"], printed("print clock; print clock() > 0;"));
        let err = failure("clock(1);");
        assert_eq!(
            RuntimeErrorKind::ArityMismatch {
                expected: 0,
                got: 1
            },
            err.kind
        );
    }
}
