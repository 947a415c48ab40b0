pub mod ast;
pub mod config;
pub mod interpreter;
pub mod parser;
pub mod reporter;
pub mod scanner;

use std::io::Write;
use std::sync::Once;

use tracing::debug;

use interpreter::{stock_interpreter, Interpreter, PrintHandler, RuntimeError};
use parser::parse;
use reporter::{Reporter, StateTrackingReporter, WriteReporter};
use scanner::scan;

/// Result of running one piece of source
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Ok,
    /// Scan or parse errors were reported, nothing was executed
    StaticError,
    RuntimeError(RuntimeError),
}

/// A session that keeps one interpreter, and its globals, across runs
pub struct Lox {
    interpreter: Interpreter,
    had_error: bool,
    had_runtime_error: bool,
}

impl Lox {
    pub fn new(print_handler: PrintHandler) -> Lox {
        Lox {
            interpreter: stock_interpreter(print_handler),
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Run source, reporting every error to stderr
    pub fn run(&mut self, source: &str) -> Outcome {
        let mut stderr = std::io::stderr().lock();
        let outcome = self.run_with(&mut WriteReporter::new(&mut stderr), source);
        if let Outcome::RuntimeError(err) = &outcome {
            _ = writeln!(stderr, "{}", err);
        }
        outcome
    }

    /// Run source with scan and parse errors sent to `reporter`
    /// A runtime error is only returned, never printed
    pub fn run_with<R>(&mut self, reporter: &mut R, source: &str) -> Outcome
    where
        R: Reporter + ?Sized,
    {
        let mut reporter = StateTrackingReporter::new(reporter);
        let tokens = scan(&mut reporter, source);
        let program = parse(&mut reporter, tokens);
        if reporter.errored() {
            debug!(errors = reporter.reported(), "static errors, skipping execution");
            self.had_error = true;
            return Outcome::StaticError;
        }
        // Parsing can't fail without reporting
        let Ok(program) = program else {
            self.had_error = true;
            return Outcome::StaticError;
        };
        match self.interpreter.interpret(&program) {
            Ok(()) => Outcome::Ok,
            Err(err) => {
                self.had_runtime_error = true;
                Outcome::RuntimeError(err)
            }
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Forget past errors, used by the prompt between lines
    pub fn reset_errors(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

impl Default for Lox {
    fn default() -> Self {
        Lox::new(PrintHandler::stdout())
    }
}

static TRACING_INIT: Once = Once::new();

/// Install a stderr tracing subscriber filtered by `filter`
/// Only the first call has any effect
pub fn init_tracing(filter: &str) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::new(filter))
            .try_init();
    });
}
