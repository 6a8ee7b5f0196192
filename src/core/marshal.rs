//! Pluggable rendering functions and process hooks owned by each logger
//!
//! Every logger carries its own copy of these, so two loggers with different
//! settings can run side by side without touching shared state.

use super::error::{LoggerError, Result};
use super::level::Level;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Renders the level meta field.
pub type LevelMarshalFn = Arc<dyn Fn(Level) -> Cow<'static, str> + Send + Sync>;
/// Renders the caller meta field from a file and line.
pub type CallerMarshalFn = Arc<dyn Fn(&str, u32) -> String + Send + Sync>;
/// Renders the error field.
pub type ErrorMarshalFn = Arc<dyn Fn(&dyn StdError) -> String + Send + Sync>;
/// Extracts a stack for the stack field; `None` omits the field.
pub type ErrorStackMarshalFn = Arc<dyn Fn(&dyn StdError) -> Option<ErrorStack> + Send + Sync>;
/// Serializes an arbitrary value into the destination buffer. Installing one
/// routes values through a `serde_json::Value` first.
pub type ValueMarshalFn = Arc<dyn Fn(&serde_json::Value, &mut Vec<u8>) -> Result<()> + Send + Sync>;
/// Receives sink failures. Must not block; may be called from any thread.
pub type ErrorHandler = Arc<dyn Fn(&LoggerError) + Send + Sync>;
/// Terminates the process after a fatal record.
pub type ExitFunc = Arc<dyn Fn(i32) + Send + Sync>;
/// Source of the meta time field.
pub type ClockFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What an error-stack marshal function produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorStack {
    Text(String),
    Value(serde_json::Value),
}

/// The set of rendering functions a logger consults per record.
#[derive(Clone)]
pub struct MarshalFuncs {
    pub level: LevelMarshalFn,
    pub caller: CallerMarshalFn,
    pub error: ErrorMarshalFn,
    pub error_stack: Option<ErrorStackMarshalFn>,
    /// `None` serializes values straight into the output with `serde_json`.
    pub value: Option<ValueMarshalFn>,
}

impl Default for MarshalFuncs {
    fn default() -> Self {
        Self {
            level: Arc::new(upper_level_name),
            caller: Arc::new(|file: &str, line: u32| format!("{}:{}", file, line)),
            error: Arc::new(|err: &dyn StdError| err.to_string()),
            error_stack: None,
            value: None,
        }
    }
}

impl fmt::Debug for MarshalFuncs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalFuncs")
            .field("error_stack", &self.error_stack.is_some())
            .field("value", &self.value.is_some())
            .finish_non_exhaustive()
    }
}

/// `INFO`, `WARN`... or the integer for unnamed levels.
pub fn upper_level_name(level: Level) -> Cow<'static, str> {
    match level {
        Level::TRACE => Cow::Borrowed("TRACE"),
        Level::DEBUG => Cow::Borrowed("DEBUG"),
        Level::INFO => Cow::Borrowed("INFO"),
        Level::WARN => Cow::Borrowed("WARN"),
        Level::ERROR => Cow::Borrowed("ERROR"),
        Level::FATAL => Cow::Borrowed("FATAL"),
        Level::PANIC => Cow::Borrowed("PANIC"),
        Level::NONE => Cow::Borrowed("UNKNOWN"),
        Level::DISABLED => Cow::Borrowed("DISABLED"),
        other => Cow::Owned(other.as_i8().to_string()),
    }
}

/// Stack made of the messages along the error's `source()` chain, outermost
/// cause first. Errors without a source have no stack.
pub fn source_chain_stack(err: &dyn StdError) -> Option<ErrorStack> {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(serde_json::Value::String(cause.to_string()));
        source = cause.source();
    }
    if chain.is_empty() {
        None
    } else {
        Some(ErrorStack::Value(serde_json::Value::Array(chain)))
    }
}

pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|err: &LoggerError| eprintln!("[LOGGER ERROR] {}", err))
}

pub fn default_exit_func() -> ExitFunc {
    Arc::new(|code: i32| std::process::exit(code))
}

pub fn default_clock() -> ClockFn {
    Arc::new(Utc::now)
}
