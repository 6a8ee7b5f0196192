//! Human-readable text encoder
//!
//! Meta fields render their values only, in registry order, followed by
//! `" >"`. Every other field renders as `key=value`, separated by spaces.

use super::{append_display, append_float, append_hex, Encoder};
use crate::core::time_format::TimeFormat;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TextEncoder {
    meta_keys: Vec<String>,
}

impl TextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys listed here render value-only.
    pub fn with_meta_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            meta_keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn meta_keys(&self) -> &[String] {
        &self.meta_keys
    }

    fn is_meta_key(&self, key: &str) -> bool {
        self.meta_keys.iter().any(|k| k == key)
    }
}

impl Encoder for TextEncoder {
    fn name(&self) -> &'static str {
        "text"
    }

    fn begin_marker(&self, _dst: &mut Vec<u8>) {}

    fn end_marker(&self, _dst: &mut Vec<u8>) {}

    fn meta_end(&self, dst: &mut Vec<u8>) {
        if !dst.is_empty() {
            dst.extend_from_slice(b" >");
        }
    }

    fn key(&self, dst: &mut Vec<u8>, key: &str) {
        if dst.last().is_some_and(|&b| b != b' ') {
            self.delim(dst);
        }
        if self.is_meta_key(key) {
            return;
        }
        dst.extend_from_slice(key.as_bytes());
        dst.push(b'=');
    }

    fn delim(&self, dst: &mut Vec<u8>) {
        if !dst.is_empty() {
            dst.push(b' ');
        }
    }

    fn object_data(&self, dst: &mut Vec<u8>, raw: &[u8]) {
        if !raw.is_empty() && !raw.starts_with(b" ") && dst.last().is_some_and(|&b| b != b' ') {
            self.delim(dst);
        }
        dst.extend_from_slice(raw);
    }

    fn string(&self, dst: &mut Vec<u8>, val: &str) {
        dst.extend_from_slice(val.as_bytes());
    }

    fn bytes(&self, dst: &mut Vec<u8>, val: &[u8]) {
        dst.extend_from_slice(val);
    }

    fn hex(&self, dst: &mut Vec<u8>, val: &[u8]) {
        append_hex(dst, val);
    }

    fn display(&self, dst: &mut Vec<u8>, val: &dyn fmt::Display) {
        let _ = append_display(dst, val);
    }

    fn f32(&self, dst: &mut Vec<u8>, val: f32) {
        append_float(dst, val as f64, true);
    }

    fn f64(&self, dst: &mut Vec<u8>, val: f64) {
        append_float(dst, val, false);
    }

    fn time(&self, dst: &mut Vec<u8>, format: &TimeFormat, val: &DateTime<Utc>) {
        format.append(dst, val);
    }

    fn rebind_meta_keys(&self, meta_keys: &[String]) -> Option<Arc<dyn Encoder>> {
        Some(Arc::new(TextEncoder::with_meta_keys(meta_keys.iter().cloned())))
    }
}
