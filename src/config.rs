use std::path::PathBuf;

use thiserror::Error;

pub const LOG_ENV: &str = "TREELOX_LOG";
pub const FALLBACK_LOG_ENV: &str = "RUST_LOG";
pub const PROMPT_ENV: &str = "TREELOX_PROMPT";
pub const DEFAULT_PROMPT: &str = "> ";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Usage: treelox [script]")]
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Script(PathBuf),
    Prompt,
}

/// Everything the binary needs to know before it starts running code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    /// `EnvFilter` directive, tracing stays off when absent
    pub log_filter: Option<String>,
    pub prompt: String,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_parts(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Build from the arguments after the program name and an environment lookup
    pub fn from_parts<A, E>(args: A, env: E) -> Result<Config, ConfigError>
    where
        A: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter();
        let mode = match (args.next(), args.next()) {
            (None, _) => Mode::Prompt,
            (Some(script), None) => Mode::Script(PathBuf::from(script)),
            (Some(_), Some(_)) => return Err(ConfigError::Usage),
        };
        let log_filter = env(LOG_ENV)
            .or_else(|| env(FALLBACK_LOG_ENV))
            .filter(|filter| !filter.is_empty());
        let prompt = env(PROMPT_ENV).unwrap_or_else(|| DEFAULT_PROMPT.to_string());
        Ok(Config {
            mode,
            log_filter,
            prompt,
        })
    }
}
