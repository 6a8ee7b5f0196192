//! Meta fields: their names, their order, and their console colors
//!
//! Meta fields (time, level, label, caller) are rendered from logger and
//! record state instead of user calls, and are placed before all other
//! fields. The registry also carries the console color table, which is only
//! consulted when rainbow console printing is enabled.

use colored::Color;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Names used for the fixed-purpose fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub message: String,
    pub error: String,
    pub stack: String,
    pub meta_time: String,
    pub meta_level: String,
    pub meta_label: String,
    pub meta_caller: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            message: "message".to_string(),
            error: "error".to_string(),
            stack: "stack".to_string(),
            meta_time: "META_TIME".to_string(),
            meta_level: "META_LEVEL".to_string(),
            meta_label: "META_LABEL".to_string(),
            meta_caller: "META_CALLER".to_string(),
        }
    }
}

impl FieldNames {
    /// Color key for the level field of the given level, e.g. `META_LEVEL_INFO`.
    pub(crate) fn level_color_key(&self, dst: &mut String, level_name: &str) {
        dst.clear();
        dst.push_str(&self.meta_level);
        dst.push('_');
        dst.extend(level_name.chars().map(|c| c.to_ascii_uppercase()));
    }

    /// Color key for the first meta field of a line, e.g. `META_LEVEL_INFO_LINE`.
    pub(crate) fn level_line_color_key(&self, dst: &mut String, level_name: &str) {
        self.level_color_key(dst, level_name);
        dst.push_str("_LINE");
    }
}

/// Color key for the meta terminator.
pub const META_END_COLOR_KEY: &str = "META_END";
/// Color key for the keys of regular fields.
pub const FIELD_KEY_COLOR_KEY: &str = "FIELD_KEY";

/// A single SGR parameter, e.g. `31` (red foreground) or `1` (bold).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SgrCode(Cow<'static, str>);

impl SgrCode {
    pub const BOLD: SgrCode = SgrCode(Cow::Borrowed("1"));
    pub const UNDERLINE: SgrCode = SgrCode(Cow::Borrowed("4"));
    pub const STRIKE_THROUGH: SgrCode = SgrCode(Cow::Borrowed("9"));
    pub const UNDERLINE_BOLD: SgrCode = SgrCode(Cow::Borrowed("21"));

    /// A raw numeric code.
    pub fn code(code: u8) -> Self {
        SgrCode(Cow::Owned(code.to_string()))
    }

    /// Foreground color.
    pub fn fg(color: Color) -> Self {
        SgrCode(color.to_fg_str())
    }

    /// Background color.
    pub fn bg(color: Color) -> Self {
        SgrCode(color.to_bg_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SgrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u8> for SgrCode {
    fn from(code: u8) -> Self {
        SgrCode::code(code)
    }
}

#[inline]
pub(crate) fn color_start(dst: &mut Vec<u8>, code: &SgrCode) {
    dst.extend_from_slice(b"\x1b[");
    dst.extend_from_slice(code.as_str().as_bytes());
    dst.push(b'm');
}

#[inline]
pub(crate) fn color_end(dst: &mut Vec<u8>) {
    dst.extend_from_slice(b"\x1b[0m");
}

/// Ordered meta keys plus the console color table.
///
/// Cloning copies both by value, so a sub-logger can never change the
/// registry of the logger it was derived from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaKeys {
    keys: Vec<String>,
    console_colors: HashMap<String, Vec<SgrCode>>,
}

impl MetaKeys {
    /// An empty registry: no meta fields and no colors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time, level, label, caller and message, with the default palette.
    pub fn with_defaults(names: &FieldNames) -> Self {
        let mut meta = MetaKeys {
            keys: vec![
                names.meta_time.clone(),
                names.meta_level.clone(),
                names.meta_label.clone(),
                names.meta_caller.clone(),
                names.message.clone(),
            ],
            console_colors: HashMap::new(),
        };

        meta.set_key_colors(&names.meta_time, vec![SgrCode::fg(Color::White)]);
        meta.set_key_colors(&names.meta_level, Vec::new());
        meta.set_key_colors(&names.meta_label, vec![SgrCode::fg(Color::BrightMagenta)]);
        meta.set_key_colors(&names.meta_caller, vec![SgrCode::fg(Color::Cyan)]);
        meta.set_key_colors(&names.message, vec![SgrCode::fg(Color::Blue)]);
        meta.set_key_colors(&names.error, vec![SgrCode::fg(Color::Red)]);
        meta.set_key_colors(FIELD_KEY_COLOR_KEY, vec![SgrCode::fg(Color::BrightBlack)]);

        let alarm = || vec![SgrCode::fg(Color::BrightRed), SgrCode::BOLD];
        let level_colors = [
            ("TRACE", vec![SgrCode::fg(Color::BrightMagenta)], Color::BrightMagenta),
            ("DEBUG", vec![SgrCode::fg(Color::Magenta)], Color::Magenta),
            ("INFO", vec![SgrCode::fg(Color::Green)], Color::Green),
            ("WARN", vec![SgrCode::fg(Color::Yellow)], Color::Yellow),
            ("ERROR", alarm(), Color::BrightRed),
            ("FATAL", alarm(), Color::BrightRed),
            ("PANIC", alarm(), Color::BrightRed),
        ];
        let mut key = String::new();
        for (name, colors, line) in level_colors {
            names.level_color_key(&mut key, name);
            meta.set_key_colors(&key, colors);
            names.level_line_color_key(&mut key, name);
            meta.set_key_colors(&key, vec![SgrCode::bg(line)]);
        }
        meta.set_key_colors(META_END_COLOR_KEY, vec![SgrCode::fg(Color::BrightCyan)]);

        meta
    }

    /// Replace the ordered key list.
    pub fn set_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
    }

    /// Append a key if it is not present yet.
    pub fn add_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn remove_key(&mut self, key: &str) {
        self.keys.retain(|k| k != key);
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn set_key_colors(&mut self, key: &str, colors: Vec<SgrCode>) {
        self.console_colors.insert(key.to_string(), colors);
    }

    pub fn remove_key_colors(&mut self, key: &str) {
        self.console_colors.remove(key);
    }

    /// Colors registered for `key`; `None` when absent or empty.
    pub fn console_colors(&self, key: &str) -> Option<&[SgrCode]> {
        match self.console_colors.get(key) {
            Some(colors) if !colors.is_empty() => Some(colors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let names = FieldNames::default();
        let meta = MetaKeys::with_defaults(&names);
        assert_eq!(
            meta.keys(),
            &["META_TIME", "META_LEVEL", "META_LABEL", "META_CALLER", "message"]
        );
        assert_eq!(
            meta.console_colors("META_LEVEL_ERROR"),
            Some(&[SgrCode::code(91), SgrCode::BOLD][..])
        );
        assert_eq!(
            meta.console_colors("META_LEVEL_INFO_LINE"),
            Some(&[SgrCode::code(42)][..])
        );
        assert_eq!(meta.console_colors("META_END"), Some(&[SgrCode::code(96)][..]));
        // registered but empty
        assert_eq!(meta.console_colors("META_LEVEL"), None);
    }

    #[test]
    fn test_clone_is_independent() {
        let parent = MetaKeys::with_defaults(&FieldNames::default());
        let mut child = parent.clone();
        child.remove_key("META_TIME");
        child.add_key("extra");
        child.set_key_colors("message", vec![SgrCode::UNDERLINE]);

        assert!(parent.contains("META_TIME"));
        assert!(!parent.contains("extra"));
        assert_eq!(
            parent.console_colors("message"),
            Some(&[SgrCode::fg(Color::Blue)][..])
        );
        assert_eq!(child.console_colors("message"), Some(&[SgrCode::UNDERLINE][..]));
    }

    #[test]
    fn test_add_key_is_idempotent() {
        let mut meta = MetaKeys::new();
        meta.add_key("a");
        meta.add_key("a");
        assert_eq!(meta.keys().len(), 1);
    }

    #[test]
    fn test_color_sequences() {
        let mut dst = Vec::new();
        color_start(&mut dst, &SgrCode::fg(Color::Red));
        dst.extend_from_slice(b"x");
        color_end(&mut dst);
        assert_eq!(dst, b"\x1b[31mx\x1b[0m");
    }

    #[test]
    fn test_color_keys() {
        let names = FieldNames::default();
        let mut key = String::new();
        names.level_color_key(&mut key, "warn");
        assert_eq!(key, "META_LEVEL_WARN");
        names.level_line_color_key(&mut key, "warn");
        assert_eq!(key, "META_LEVEL_WARN_LINE");
    }
}
