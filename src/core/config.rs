//! Serializable logger configuration
//!
//! Mirrors the shape of the usual `chromalog` config section. Turning it into a
//! logger needs the already-opened sinks: file creation and rotation are the
//! caller's business.

use super::error::{LoggerError, Result};
use super::level::Level;
use super::logger::LoggerBuilder;
use super::time_format::DEFAULT_TIME_LAYOUT;
use crate::encoder::encoder_by_name;
use crate::writers::LevelWriter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One output: which encoder renders records for the matching writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    pub encoder: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            encoder: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub enable: bool,
    pub level: String,
    pub label: String,
    pub stack: bool,
    pub enable_console_printing: bool,
    pub enable_rainbow_console: bool,
    pub time_format: String,
    /// Capacity of each buffer of a buffered writer, e.g. `"4K"` or `"100M"`.
    pub buffer_size: String,
    pub outputs: Vec<OutputConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            level: "DEBUG".to_string(),
            label: String::new(),
            stack: false,
            enable_console_printing: true,
            enable_rainbow_console: true,
            time_format: DEFAULT_TIME_LAYOUT.to_string(),
            buffer_size: "100M".to_string(),
            outputs: Vec::new(),
        }
    }
}

impl LoggerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The configured level; DISABLED when logging is turned off.
    pub fn parsed_level(&self) -> Result<Level> {
        if !self.enable {
            return Ok(Level::DISABLED);
        }
        self.level.parse()
    }

    pub fn buffer_size_bytes(&self) -> Result<usize> {
        parse_size(&self.buffer_size)
    }

    /// A builder carrying this configuration, with `writers[i]` receiving
    /// output `i`.
    ///
    /// ```
    /// use chromalog::{LevelWriter, LoggerConfig, MemoryWriter};
    /// use std::sync::Arc;
    ///
    /// let config = LoggerConfig::from_json(
    ///     r#"{"level": "info", "enableConsolePrinting": false, "outputs": [{"encoder": "text"}]}"#,
    /// )
    /// .unwrap();
    /// let out = MemoryWriter::new();
    /// let logger = config
    ///     .builder_with(vec![Arc::new(out.clone()) as Arc<dyn LevelWriter>])
    ///     .unwrap()
    ///     .meta_keys(["META_LEVEL", "message"])
    ///     .build();
    ///
    /// logger.info().msg("ready").done();
    /// assert_eq!(out.contents_string(), "INFO > ready\n");
    /// ```
    pub fn builder_with(&self, writers: Vec<Arc<dyn LevelWriter>>) -> Result<LoggerBuilder> {
        if writers.len() != self.outputs.len() {
            return Err(LoggerError::config(
                "LoggerConfig",
                format!(
                    "{} outputs configured but {} writers given",
                    self.outputs.len(),
                    writers.len()
                ),
            ));
        }

        let mut builder = LoggerBuilder::new()
            .with_defaults()
            .level(self.parsed_level()?)
            .label(self.label.as_str())
            .stack(self.stack)
            .console_print(self.enable && self.enable_console_printing)
            .rainbow_console(self.enable_rainbow_console)
            .time_format(&self.time_format)?;

        for (output, writer) in self.outputs.iter().zip(writers) {
            builder = builder.encoder_writer_pair(encoder_by_name(&output.encoder)?, writer);
        }
        Ok(builder)
    }
}

/// Parses sizes such as `"512"`, `"4K"`, `"100MB"` or `"1g"` into bytes.
pub fn parse_size(s: &str) -> Result<usize> {
    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();
    let digits_end = upper
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(upper.len());
    let (number, unit) = upper.split_at(digits_end);
    if number.is_empty() {
        return Err(LoggerError::InvalidSize(s.to_string()));
    }

    let multiplier: usize = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1 << 10,
        "M" | "MB" => 1 << 20,
        "G" | "GB" => 1 << 30,
        _ => return Err(LoggerError::InvalidSize(s.to_string())),
    };
    number
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| LoggerError::InvalidSize(s.to_string()))
}
