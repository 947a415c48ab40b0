mod builtin;
mod callable;
mod environment;
mod print_handler;
mod runtime;
mod value;

pub use builtin::populate_builtin;
pub use callable::{Callable, LoxFunction, NativeFn, NativeFunc};
pub use environment::{EnvRef, Environment};
pub use print_handler::{BufferPrintHandler, PrintHandler, StdoutPrintHandler};
pub use runtime::{Flow, Interpreter, RuntimeError, RuntimeErrorKind};
pub use value::Value;

/// An interpreter whose globals hold the native functions
pub fn stock_interpreter(print_handler: PrintHandler) -> Interpreter {
    let mut global_env = Environment::new_global();
    populate_builtin(&mut global_env);
    Interpreter::new_from_global(global_env, print_handler)
}
