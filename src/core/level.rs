//! Log level definitions

use super::error::{LoggerError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Severity of a record.
///
/// Levels are plain signed integers so that values parsed from configuration
/// outside the named range still order correctly. A record is suppressed when
/// its level is below the logger's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Level(i8);

impl Level {
    pub const TRACE: Level = Level(-1);
    pub const DEBUG: Level = Level(0);
    pub const INFO: Level = Level(1);
    pub const WARN: Level = Level(2);
    pub const ERROR: Level = Level(3);
    /// Records at this level terminate the process once written.
    pub const FATAL: Level = Level(4);
    /// Records at this level panic with their message once written.
    pub const PANIC: Level = Level(5);
    /// Unknown level.
    pub const NONE: Level = Level(6);
    /// A logger at this level emits nothing; a record at this level is discarded.
    pub const DISABLED: Level = Level(7);

    const NAMED: [(Level, &'static str, &'static str); 9] = [
        (Level::TRACE, "trace", "TRA"),
        (Level::DEBUG, "debug", "DEB"),
        (Level::INFO, "info", "INF"),
        (Level::WARN, "warn", "WAR"),
        (Level::ERROR, "error", "ERR"),
        (Level::FATAL, "fatal", "FAT"),
        (Level::PANIC, "panic", "PAN"),
        (Level::NONE, "unknown", "UNK"),
        (Level::DISABLED, "disabled", "DIS"),
    ];

    #[inline]
    pub const fn from_i8(value: i8) -> Self {
        Level(value)
    }

    #[inline]
    pub const fn as_i8(self) -> i8 {
        self.0
    }

    /// Lowercase name, or `None` for values outside the named set.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(level, _, _)| *level == self)
            .map(|(_, name, _)| *name)
    }

    /// Three-letter tag used by the console printer.
    pub fn abbreviation(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(level, _, _)| *level == self)
            .map(|(_, _, abbr)| *abbr)
    }

    /// Matches the named levels case-insensitively; `None` if nothing matched.
    pub fn from_name(s: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(s))
            .map(|(level, _, _)| *level)
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::DEBUG
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(level) = Level::from_name(s) {
            return Ok(level);
        }
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| LoggerError::InvalidLevel(s.to_string()))?;
        i8::try_from(value)
            .map(Level)
            .map_err(|_| LoggerError::LevelOutOfRange(value))
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
