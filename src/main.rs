use std::fs::File;
use std::io::prelude::*;
use std::io::{stdout, BufReader};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use treelox::config::{Config, ConfigError, Mode};
use treelox::interpreter::PrintHandler;
use treelox::{init_tracing, Lox};

const EXIT_USAGE: u8 = 64;
const EXIT_DATA_ERROR: u8 = 65;
const EXIT_SOFTWARE: u8 = 70;

fn main() -> Result<ExitCode> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err @ ConfigError::Usage) => {
            eprintln!("{}", err);
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };
    if let Some(filter) = &config.log_filter {
        init_tracing(filter);
    }

    match &config.mode {
        Mode::Script(path) => run_file(path),
        Mode::Prompt => {
            run_prompt(&config.prompt)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_file(path: &Path) -> Result<ExitCode> {
    let mut file = File::open(path)
        .with_context(|| format!("Unable to open script file {}", path.display()))?;
    let mut script = String::new();
    file.read_to_string(&mut script)
        .context("Unable to read script file")?;

    let mut lox = Lox::new(PrintHandler::stdout());
    lox.run(&script);
    if lox.had_error() {
        Ok(ExitCode::from(EXIT_DATA_ERROR))
    } else if lox.had_runtime_error() {
        Ok(ExitCode::from(EXIT_SOFTWARE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_prompt(prompt: &str) -> Result<()> {
    let stdin = std::io::stdin().lock();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();
    let mut lox = Lox::new(PrintHandler::stdout());
    loop {
        {
            let mut stdout = stdout().lock();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
        }
        let n = reader
            .read_line(&mut line)
            .context("Unable to read from stdin")?;
        if n == 0 {
            break;
        }
        lox.run(&line);
        // A mistake on one line shouldn't poison the rest of the session
        lox.reset_errors();
        line.clear();
    }
    Ok(())
}
