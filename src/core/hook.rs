//! Hooks run by [`Record::done`](crate::Record::done)
//!
//! Hooks see every finalized record, including records that are struck by the
//! logger level, so they can count or forward them independently of output.

use super::level::Level;
use super::record::Record;
use std::fmt;
use std::sync::Arc;

pub trait Hook: Send + Sync {
    fn run_hook(&self, record: &Record<'_>, level: Level, message: &str);
}

/// Adapts a closure into a [`Hook`].
///
/// # Example
///
/// ```
/// use chromalog::{HookFn, Level, Record};
///
/// let hook = HookFn(|_record: &Record<'_>, level: Level, message: &str| {
///     if level >= Level::ERROR {
///         eprintln!("alert: {}", message);
///     }
/// });
/// # let _ = hook;
/// ```
pub struct HookFn<F>(pub F);

impl<F> Hook for HookFn<F>
where
    F: Fn(&Record<'_>, Level, &str) + Send + Sync,
{
    fn run_hook(&self, record: &Record<'_>, level: Level, message: &str) {
        (self.0)(record, level, message)
    }
}

impl<F> fmt::Debug for HookFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HookFn")
    }
}

/// Dispatches to a different hook per level. Levels without a hook, and
/// levels outside the named set, are ignored.
#[derive(Clone, Default)]
pub struct LevelHook {
    pub none: Option<Arc<dyn Hook>>,
    pub trace: Option<Arc<dyn Hook>>,
    pub debug: Option<Arc<dyn Hook>>,
    pub info: Option<Arc<dyn Hook>>,
    pub warn: Option<Arc<dyn Hook>>,
    pub error: Option<Arc<dyn Hook>>,
    pub fatal: Option<Arc<dyn Hook>>,
    pub panic: Option<Arc<dyn Hook>>,
}

impl LevelHook {
    pub fn new() -> Self {
        Self::default()
    }

    fn for_level(&self, level: Level) -> Option<&Arc<dyn Hook>> {
        match level {
            Level::NONE => self.none.as_ref(),
            Level::TRACE => self.trace.as_ref(),
            Level::DEBUG => self.debug.as_ref(),
            Level::INFO => self.info.as_ref(),
            Level::WARN => self.warn.as_ref(),
            Level::ERROR => self.error.as_ref(),
            Level::FATAL => self.fatal.as_ref(),
            Level::PANIC => self.panic.as_ref(),
            _ => None,
        }
    }
}

impl Hook for LevelHook {
    fn run_hook(&self, record: &Record<'_>, level: Level, message: &str) {
        if let Some(hook) = self.for_level(level) {
            hook.run_hook(record, level, message);
        }
    }
}

impl fmt::Debug for LevelHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelHook")
            .field("none", &self.none.is_some())
            .field("trace", &self.trace.is_some())
            .field("debug", &self.debug.is_some())
            .field("info", &self.info.is_some())
            .field("warn", &self.warn.is_some())
            .field("error", &self.error.is_some())
            .field("fatal", &self.fatal.is_some())
            .field("panic", &self.panic.is_some())
            .finish()
    }
}
