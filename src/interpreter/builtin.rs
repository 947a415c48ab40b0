use std::rc::Rc;
use std::time::SystemTime;

use super::callable::NativeFunc;
use super::environment::Environment;
use super::runtime::{Interpreter, RuntimeErrorKind};
use super::value::Value;

fn clock(_interpreter: &mut Interpreter, _args: Vec<Value>) -> Result<Value, RuntimeErrorKind> {
    let duration = SystemTime::UNIX_EPOCH
        .elapsed()
        .map_err(|err| RuntimeErrorKind::Native(err.to_string()))?;
    Ok(Value::Number(duration.as_secs_f64()))
}

pub fn populate_builtin(global_env: &mut Environment) {
    global_env.define(
        "clock",
        Value::Callable(Rc::new(NativeFunc {
            name: "clock",
            arity: 0,
            call: clock,
        })),
    );
}
