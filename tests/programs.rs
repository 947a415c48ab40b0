use pretty_assertions::assert_eq;

use treelox::interpreter::{PrintHandler, RuntimeErrorKind};
use treelox::reporter::{CollectingReporter, Diagnostic};
use treelox::{Lox, Outcome};

struct Run {
    printed: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    outcome: Outcome,
}

fn run_in(lox: &mut Lox, source: &str) -> Run {
    let mut reporter = CollectingReporter::new();
    let outcome = lox.run_with(&mut reporter, source);
    Run {
        printed: lox.interpreter_mut().print_handler_mut().take(),
        diagnostics: reporter.diagnostics,
        outcome,
    }
}

fn run(source: &str) -> Run {
    run_in(&mut Lox::new(PrintHandler::buffer()), source)
}

fn runtime_error(outcome: Outcome) -> (RuntimeErrorKind, usize) {
    match outcome {
        Outcome::RuntimeError(err) => (err.kind, err.line),
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[test]
fn expression_statement_prints_nothing() {
    let result = run("1+2*3;");
    assert_eq!(Outcome::Ok, result.outcome);
    assert!(result.printed.is_empty());
}

#[test]
fn print_uses_precedence() {
    let result = run("print 1+2*3;");
    assert_eq!(Outcome::Ok, result.outcome);
    assert_eq!(vec!["7"], result.printed);
}

#[test]
fn invalid_assignment_target_is_a_static_error() {
    let mut lox = Lox::new(PrintHandler::buffer());
    let result = run_in(&mut lox, "1 = 2; print \"unreached\";");
    assert_eq!(Outcome::StaticError, result.outcome);
    assert_eq!(1, result.diagnostics.len());
    assert!(result.diagnostics[0]
        .message
        .contains("Invalid assignment target"));
    assert!(result.printed.is_empty());
    assert!(lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn scan_errors_prevent_execution() {
    let mut lox = Lox::new(PrintHandler::buffer());
    let result = run_in(&mut lox, "print 1; @");
    assert_eq!(Outcome::StaticError, result.outcome);
    assert_eq!(1, result.diagnostics.len());
    assert!(result.printed.is_empty());
    assert!(lox.had_error());
}

#[test]
fn block_shadowing_restores_outer_binding() {
    let result = run("var a = 1; { var a = 2; print a; } print a;");
    assert_eq!(vec!["2", "1"], result.printed);
}

#[test]
fn closures_share_captured_state() {
    let result = run(
        "fun make() { var x = 0; fun inc() { x = x + 1; return x; } return inc; } \
         var c = make(); print c(); print c();",
    );
    assert_eq!(Outcome::Ok, result.outcome);
    assert_eq!(vec!["1", "2"], result.printed);
}

#[test]
fn separate_closures_have_separate_state() {
    let result = run(
        "fun make() { var x = 0; fun inc() { x = x + 1; return x; } return inc; } \
         var a = make(); var b = make(); print a(); print a(); print b();",
    );
    assert_eq!(vec!["1", "2", "1"], result.printed);
}

#[test]
fn undefined_variable_is_one_runtime_error() {
    let mut lox = Lox::new(PrintHandler::buffer());
    let result = run_in(&mut lox, "print undefinedName;");
    assert!(result.printed.is_empty());
    assert!(result.diagnostics.is_empty());
    let (kind, line) = runtime_error(result.outcome);
    assert_eq!(
        RuntimeErrorKind::UndefinedVariable("undefinedName".to_string()),
        kind
    );
    assert_eq!(1, line);
    assert!(lox.had_runtime_error());
    assert!(!lox.had_error());
}

#[test]
fn adding_number_and_string_is_a_type_error() {
    let result = run("print 1 + \"a\";");
    assert!(result.printed.is_empty());
    let (kind, _) = runtime_error(result.outcome);
    assert_eq!(RuntimeErrorKind::InvalidAddOperands, kind);
    assert_eq!(
        "Operands must be two numbers or two strings.",
        kind.to_string()
    );
}

#[test]
fn arity_mismatch_reports_counts_at_call_line() {
    let result = run("fun none() {}\n\nnone(1);");
    let (kind, line) = runtime_error(result.outcome);
    assert_eq!(
        RuntimeErrorKind::ArityMismatch {
            expected: 0,
            got: 1
        },
        kind
    );
    assert_eq!(3, line);
}

#[test]
fn double_negation_is_truthiness() {
    let result = run(
        "print !!nil; print !!false; print !!true; print !!0; print !!\"\"; print !!clock;",
    );
    assert_eq!(
        vec!["false", "false", "true", "true", "true", "true"],
        result.printed
    );
}

#[test]
fn recursion() {
    let result = run(
        "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);",
    );
    assert_eq!(vec!["610"], result.printed);
}

#[test]
fn for_loops_scope_their_initializer() {
    let result = run("var i = \"outer\"; for (var i = 0; i < 3; i = i + 1) print i; print i;");
    assert_eq!(vec!["0", "1", "2", "outer"], result.printed);
}

#[test]
fn for_loop_clauses_are_optional() {
    let result = run("var i = 0; for (; i < 2;) { print i; i = i + 1; }");
    assert_eq!(vec!["0", "1"], result.printed);
}

#[test]
fn top_level_return_is_a_runtime_error() {
    let result = run("print 1; return; print 2;");
    assert_eq!(vec!["1"], result.printed);
    let (kind, _) = runtime_error(result.outcome);
    assert_eq!(RuntimeErrorKind::ReturnOutsideFunction, kind);
}

#[test]
fn functions_print_their_names() {
    let result = run("fun greet() {} print greet; print clock;");
    assert_eq!(vec!["<fn greet>", "<native fn>"], result.printed);
}

#[test]
fn session_keeps_globals_between_runs() {
    let mut lox = Lox::new(PrintHandler::buffer());
    assert_eq!(Outcome::Ok, run_in(&mut lox, "var a = 1;").outcome);
    assert!(matches!(
        run_in(&mut lox, "print nope;").outcome,
        Outcome::RuntimeError(_)
    ));
    lox.reset_errors();
    assert!(!lox.had_runtime_error());
    let result = run_in(&mut lox, "a = a + 1; print a;");
    assert_eq!(vec!["2"], result.printed);
}

#[test]
fn separate_sessions_are_isolated() {
    let mut first = Lox::new(PrintHandler::buffer());
    let mut second = Lox::new(PrintHandler::buffer());
    run_in(&mut first, "var shared = 1;");
    let (kind, _) = runtime_error(run_in(&mut second, "print shared;").outcome);
    assert_eq!(
        RuntimeErrorKind::UndefinedVariable("shared".to_string()),
        kind
    );
}

#[test]
fn division_by_zero_is_not_an_error() {
    let result = run("print 1 / 0; print -1 / 0;");
    assert_eq!(Outcome::Ok, result.outcome);
    assert_eq!(vec!["inf", "-inf"], result.printed);
}
