//! JSON encoder

use super::{append_display, append_float, append_hex, Encoder, HEX_DIGITS};
use crate::core::time_format::TimeFormat;
use chrono::{DateTime, Utc};
use std::fmt;

/// Bytes that can be copied into a JSON string unchanged.
const NO_ESCAPE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0x20;
    while i < 0x7f {
        table[i] = i != b'"' as usize && i != b'\\' as usize;
        i += 1;
    }
    table
};

/// Renders one JSON object per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl JsonEncoder {
    fn quoted_str(dst: &mut Vec<u8>, s: &str) {
        dst.push(b'"');
        append_escaped_str(dst, s);
        dst.push(b'"');
    }
}

impl Encoder for JsonEncoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn begin_marker(&self, dst: &mut Vec<u8>) {
        dst.push(b'{');
    }

    fn end_marker(&self, dst: &mut Vec<u8>) {
        dst.push(b'}');
    }

    fn meta_end(&self, _dst: &mut Vec<u8>) {}

    fn key(&self, dst: &mut Vec<u8>, key: &str) {
        if dst.last().is_some_and(|&b| b != b'{') {
            self.delim(dst);
        }
        Self::quoted_str(dst, key);
        dst.push(b':');
    }

    fn delim(&self, dst: &mut Vec<u8>) {
        if !dst.is_empty() {
            dst.push(b',');
        }
    }

    fn object_data(&self, dst: &mut Vec<u8>, raw: &[u8]) {
        let raw = raw.strip_prefix(b"{").unwrap_or(raw);
        // `}` alone means the record carried no fields
        if dst.len() > 1 && !raw.starts_with(b"}") && !raw.is_empty() {
            self.delim(dst);
        }
        dst.extend_from_slice(raw);
    }

    fn string(&self, dst: &mut Vec<u8>, val: &str) {
        Self::quoted_str(dst, val);
    }

    fn bytes(&self, dst: &mut Vec<u8>, val: &[u8]) {
        dst.push(b'"');
        append_escaped_bytes(dst, val);
        dst.push(b'"');
    }

    fn hex(&self, dst: &mut Vec<u8>, val: &[u8]) {
        dst.push(b'"');
        append_hex(dst, val);
        dst.push(b'"');
    }

    fn display(&self, dst: &mut Vec<u8>, val: &dyn fmt::Display) {
        dst.push(b'"');
        let mark = dst.len();
        let _ = append_display(dst, val);
        escape_tail_in_place(dst, mark);
        dst.push(b'"');
    }

    fn f32(&self, dst: &mut Vec<u8>, val: f32) {
        if !val.is_finite() {
            dst.push(b'"');
            append_float(dst, val as f64, true);
            dst.push(b'"');
            return;
        }
        append_float(dst, val as f64, true);
    }

    fn f64(&self, dst: &mut Vec<u8>, val: f64) {
        if !val.is_finite() {
            dst.push(b'"');
            append_float(dst, val, false);
            dst.push(b'"');
            return;
        }
        append_float(dst, val, false);
    }

    fn time(&self, dst: &mut Vec<u8>, format: &TimeFormat, val: &DateTime<Utc>) {
        match format.numeric(val) {
            Some(n) => self.i64(dst, n),
            None => {
                dst.push(b'"');
                let mark = dst.len();
                format.append(dst, val);
                escape_tail_in_place(dst, mark);
                dst.push(b'"');
            }
        }
    }
}

/// Escapes a UTF-8 string as JSON string content.
///
/// Scans for the first byte that needs escaping and copies the clean prefix
/// in one go; only the remainder goes through the byte-by-byte path.
pub fn append_escaped_str(dst: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    match bytes.iter().position(|&b| !NO_ESCAPE[b as usize]) {
        None => dst.extend_from_slice(bytes),
        Some(i) => {
            dst.extend_from_slice(&bytes[..i]);
            escape_valid_utf8(dst, &bytes[i..]);
        }
    }
}

/// Escapes arbitrary bytes as JSON string content. Invalid UTF-8 sequences
/// become `\ufffd`.
pub fn append_escaped_bytes(dst: &mut Vec<u8>, s: &[u8]) {
    match s.iter().position(|&b| !NO_ESCAPE[b as usize]) {
        None => dst.extend_from_slice(s),
        Some(i) => {
            dst.extend_from_slice(&s[..i]);
            escape_complex(dst, &s[i..]);
        }
    }
}

fn escape_complex(dst: &mut Vec<u8>, mut s: &[u8]) {
    loop {
        match std::str::from_utf8(s) {
            Ok(valid) => {
                escape_valid_utf8(dst, valid.as_bytes());
                return;
            }
            Err(e) => {
                let (valid, rest) = s.split_at(e.valid_up_to());
                escape_valid_utf8(dst, valid);
                dst.extend_from_slice(b"\\ufffd");
                match e.error_len() {
                    Some(len) => s = &rest[len..],
                    None => return,
                }
            }
        }
    }
}

/// `s` must be valid UTF-8; multibyte sequences are copied unchanged.
fn escape_valid_utf8(dst: &mut Vec<u8>, s: &[u8]) {
    for &b in s {
        match escape_byte(b) {
            Some((seq, len)) => dst.extend_from_slice(&seq[..len]),
            None => dst.push(b),
        }
    }
}

/// Escapes `dst[start..]` in place, growing `dst` once. The tail must be
/// valid UTF-8, which holds for anything rendered through `fmt`.
fn escape_tail_in_place(dst: &mut Vec<u8>, start: usize) {
    let extra: usize = dst[start..]
        .iter()
        .map(|&b| escape_byte(b).map_or(0, |(_, len)| len - 1))
        .sum();
    if extra == 0 {
        return;
    }
    let end = dst.len();
    dst.resize(end + extra, 0);
    // writes trail reads, so every byte is read before it is overwritten
    let mut at = dst.len();
    for read in (start..end).rev() {
        let b = dst[read];
        match escape_byte(b) {
            Some((seq, len)) => {
                at -= len;
                dst[at..at + len].copy_from_slice(&seq[..len]);
            }
            None => {
                at -= 1;
                dst[at] = b;
            }
        }
    }
}

/// The escape sequence for `b`, or `None` when it is copied unchanged.
fn escape_byte(b: u8) -> Option<([u8; 6], usize)> {
    if b >= 0x7f || NO_ESCAPE[b as usize] {
        return None;
    }
    let short = |c: u8| ([b'\\', c, 0, 0, 0, 0], 2);
    Some(match b {
        b'"' => short(b'"'),
        b'\\' => short(b'\\'),
        b'\n' => short(b'n'),
        b'\r' => short(b'r'),
        b'\t' => short(b't'),
        0x08 => short(b'b'),
        0x0c => short(b'f'),
        _ => (
            [
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX_DIGITS[(b >> 4) as usize],
                HEX_DIGITS[(b & 0x0f) as usize],
            ],
            6,
        ),
    })
}
