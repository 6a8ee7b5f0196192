//! Time format selection for time fields and the meta time field
//!
//! A format is chosen from a selector string: the empty string renders Unix
//! seconds, the reserved tokens `UNIXMS`, `UNIXMICRO` and `UNIXNANO` render
//! integer milliseconds, microseconds and nanoseconds, and anything else is a
//! strftime layout.
//!
//! Layouts are checked when parsed: a selector chrono cannot render is a
//! configuration error, not a failure at log time.

use super::error::{LoggerError, Result};
use crate::encoder::ByteWriter;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Selector that renders Unix seconds.
pub const TIME_FORMAT_UNIX: &str = "";
/// Selector that renders Unix milliseconds.
pub const TIME_FORMAT_UNIX_MS: &str = "UNIXMS";
/// Selector that renders Unix microseconds.
pub const TIME_FORMAT_UNIX_MICRO: &str = "UNIXMICRO";
/// Selector that renders Unix nanoseconds.
pub const TIME_FORMAT_UNIX_NANO: &str = "UNIXNANO";
/// Layout used when a logger is not configured otherwise.
pub const DEFAULT_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFormat {
    /// Unix timestamp in seconds: `1736332245`
    Unix,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Unix timestamp in microseconds: `1736332245123456`
    UnixMicros,

    /// Unix timestamp in nanoseconds
    UnixNanos,

    /// strftime layout
    ///
    /// # Examples
    ///
    /// ```
    /// use chromalog::TimeFormat;
    ///
    /// let format = TimeFormat::Layout("%d/%b/%Y:%H:%M:%S %z".to_string());
    /// assert!(!format.is_numeric());
    /// ```
    Layout(String),
}

impl Default for TimeFormat {
    fn default() -> Self {
        TimeFormat::Layout(DEFAULT_TIME_LAYOUT.to_string())
    }
}

impl TimeFormat {
    /// Integer value for the Unix-based formats, `None` for layouts.
    #[must_use]
    pub fn numeric(&self, datetime: &DateTime<Utc>) -> Option<i64> {
        match self {
            TimeFormat::Unix => Some(datetime.timestamp()),
            TimeFormat::UnixMillis => Some(datetime.timestamp_millis()),
            TimeFormat::UnixMicros => Some(datetime.timestamp_micros()),
            // Out of range after year 2262
            TimeFormat::UnixNanos => Some(datetime.timestamp_nanos_opt().unwrap_or(i64::MAX)),
            TimeFormat::Layout(_) => None,
        }
    }

    /// Check if this is a Unix-based numeric format
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, TimeFormat::Layout(_))
    }

    /// Parses a selector string.
    ///
    /// # Errors
    ///
    /// [`LoggerError::InvalidConfiguration`] when a layout holds a specifier
    /// chrono does not know, such as `%Q` or a trailing `%`.
    pub fn parse(selector: &str) -> Result<Self> {
        let format = match selector {
            TIME_FORMAT_UNIX => TimeFormat::Unix,
            TIME_FORMAT_UNIX_MS => TimeFormat::UnixMillis,
            TIME_FORMAT_UNIX_MICRO => TimeFormat::UnixMicros,
            TIME_FORMAT_UNIX_NANO => TimeFormat::UnixNanos,
            layout => TimeFormat::Layout(layout.to_string()),
        };
        format.validate()?;
        Ok(format)
    }

    /// Checks that a layout can be rendered. Numeric formats always can.
    pub fn validate(&self) -> Result<()> {
        match self {
            TimeFormat::Layout(layout) if !layout_is_valid(layout) => Err(LoggerError::config(
                "TimeFormat",
                format!("invalid strftime layout '{}'", layout),
            )),
            _ => Ok(()),
        }
    }

    /// Append the time rendered through the layout. Numeric formats append
    /// their integer. A layout that fails to render (only possible for one
    /// built without [`TimeFormat::parse`]) falls back to RFC 3339.
    ///
    /// Layouts without a time zone specifier render without allocating.
    pub fn append(&self, dst: &mut Vec<u8>, datetime: &DateTime<Utc>) {
        if let Some(value) = self.numeric(datetime) {
            let _ = write!(dst, "{}", value);
            return;
        }
        let TimeFormat::Layout(layout) = self else {
            return;
        };
        let mark = dst.len();
        let items = StrftimeItems::new(layout);
        // a naive time has no offset, so %z and %Z fail there
        let naive = datetime.naive_utc();
        if naive.format_with_items(items.clone()).write_to(&mut ByteWriter(&mut *dst)).is_ok() {
            return;
        }
        dst.truncate(mark);
        if datetime.format_with_items(items).write_to(&mut ByteWriter(&mut *dst)).is_ok() {
            return;
        }
        dst.truncate(mark);
        let rfc3339 = StrftimeItems::new("%Y-%m-%dT%H:%M:%S%.f%:z");
        let _ = datetime.format_with_items(rfc3339).write_to(&mut ByteWriter(&mut *dst));
    }

    /// The selector string this format was parsed from.
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            TimeFormat::Unix => TIME_FORMAT_UNIX,
            TimeFormat::UnixMillis => TIME_FORMAT_UNIX_MS,
            TimeFormat::UnixMicros => TIME_FORMAT_UNIX_MICRO,
            TimeFormat::UnixNanos => TIME_FORMAT_UNIX_NANO,
            TimeFormat::Layout(layout) => layout,
        }
    }
}

fn layout_is_valid(layout: &str) -> bool {
    !StrftimeItems::new(layout).any(|item| matches!(item, Item::Error))
}

impl FromStr for TimeFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        TimeFormat::parse(s)
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl Serialize for TimeFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.selector())
    }
}

impl<'de> Deserialize<'de> for TimeFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TimeFormat::parse(&s).map_err(de::Error::custom)
    }
}
