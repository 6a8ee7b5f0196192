//! Byte-level encoders
//!
//! An [`Encoder`] appends rendered values and structural tokens to a caller
//! supplied buffer. Encoders never fail and never allocate beyond growing the
//! destination buffer.

mod json;
mod text;

pub use json::JsonEncoder;
pub use text::TextEncoder;

use crate::core::error::{LoggerError, Result};
use crate::core::time_format::TimeFormat;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Serialization rules for one output format.
///
/// Every method appends to `dst`. Narrow integer widths are widened to
/// [`Encoder::i64`] / [`Encoder::u64`] by the callers.
pub trait Encoder: Send + Sync + fmt::Debug {
    /// Registry name, e.g. `"json"`.
    fn name(&self) -> &'static str;

    fn begin_marker(&self, dst: &mut Vec<u8>);
    fn end_marker(&self, dst: &mut Vec<u8>);

    /// Terminates the meta block.
    fn meta_end(&self, dst: &mut Vec<u8>);

    /// Appends a field key, preceded by a delimiter when needed.
    fn key(&self, dst: &mut Vec<u8>, key: &str);

    /// Field delimiter, only when `dst` is non-empty.
    fn delim(&self, dst: &mut Vec<u8>);

    fn array_start(&self, dst: &mut Vec<u8>) {
        dst.push(b'[');
    }

    fn array_end(&self, dst: &mut Vec<u8>) {
        dst.push(b']');
    }

    fn array_delim(&self, dst: &mut Vec<u8>) {
        dst.push(b',');
    }

    fn line_break(&self, dst: &mut Vec<u8>) {
        dst.push(b'\n');
    }

    fn blank_space(&self, dst: &mut Vec<u8>) {
        dst.push(b' ');
    }

    /// Merges the field block `raw` onto the meta block in `dst`.
    fn object_data(&self, dst: &mut Vec<u8>, raw: &[u8]);

    fn nil(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(b"null");
    }

    fn bool(&self, dst: &mut Vec<u8>, val: bool) {
        dst.extend_from_slice(if val { b"true" } else { b"false" });
    }

    fn string(&self, dst: &mut Vec<u8>, val: &str);
    fn bytes(&self, dst: &mut Vec<u8>, val: &[u8]);

    /// Two lowercase hex digits per input byte.
    fn hex(&self, dst: &mut Vec<u8>, val: &[u8]);

    /// Renders anything printable the same way [`Encoder::string`] would.
    fn display(&self, dst: &mut Vec<u8>, val: &dyn fmt::Display);

    fn i64(&self, dst: &mut Vec<u8>, val: i64) {
        let _ = write!(dst, "{}", val);
    }

    fn u64(&self, dst: &mut Vec<u8>, val: u64) {
        let _ = write!(dst, "{}", val);
    }

    fn f32(&self, dst: &mut Vec<u8>, val: f32);
    fn f64(&self, dst: &mut Vec<u8>, val: f64);

    fn time(&self, dst: &mut Vec<u8>, format: &TimeFormat, val: &DateTime<Utc>);

    /// `val / unit`, truncated to an integer when `use_int` is set.
    fn duration(&self, dst: &mut Vec<u8>, unit: Duration, use_int: bool, val: Duration) {
        let unit = unit.as_nanos().max(1);
        if use_int {
            self.i64(dst, i64::try_from(val.as_nanos() / unit).unwrap_or(i64::MAX));
        } else {
            self.f64(dst, val.as_nanos() as f64 / unit as f64);
        }
    }

    fn ip_addr(&self, dst: &mut Vec<u8>, val: &IpAddr) {
        self.display(dst, val);
    }

    fn ip_prefix(&self, dst: &mut Vec<u8>, val: &ipnet::IpNet) {
        self.display(dst, val);
    }

    /// Hardware address as colon separated hex pairs.
    fn mac_addr(&self, dst: &mut Vec<u8>, val: &[u8]) {
        self.display(dst, &MacAddr(val));
    }

    /// Inserts an already marshaled value verbatim.
    fn interface(&self, dst: &mut Vec<u8>, rendered: &[u8]) {
        dst.extend_from_slice(rendered);
    }

    /// An encoder bound to a new set of meta keys, for formats that render
    /// meta keys differently from regular ones.
    fn rebind_meta_keys(&self, _meta_keys: &[String]) -> Option<Arc<dyn Encoder>> {
        None
    }
}

/// Appends `items` as an array, rendering each element with `each`.
pub fn encode_array<T>(
    enc: &dyn Encoder,
    dst: &mut Vec<u8>,
    items: &[T],
    mut each: impl FnMut(&dyn Encoder, &mut Vec<u8>, &T),
) {
    enc.array_start(dst);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            enc.array_delim(dst);
        }
        each(enc, dst, item);
    }
    enc.array_end(dst);
}

/// Looks up an encoder by its configuration name (case-insensitive).
pub fn encoder_by_name(name: &str) -> Result<Arc<dyn Encoder>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(Arc::new(JsonEncoder)),
        "text" => Ok(Arc::new(TextEncoder::default())),
        _ => Err(LoggerError::UnknownEncoder(name.to_string())),
    }
}

struct MacAddr<'a>(&'a [u8]);

impl fmt::Display for MacAddr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// `fmt::Write` over a byte buffer. Unlike `io::Write::write_fmt`, a failing
/// `Display` impl surfaces as `Err` instead of a panic.
pub(crate) struct ByteWriter<'a>(pub(crate) &'a mut Vec<u8>);

impl fmt::Write for ByteWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Appends `val`, leaving `dst` untouched when its `Display` impl fails.
pub(crate) fn append_display(dst: &mut Vec<u8>, val: &dyn fmt::Display) -> fmt::Result {
    let mark = dst.len();
    let result = fmt::Write::write_fmt(&mut ByteWriter(&mut *dst), format_args!("{}", val));
    if result.is_err() {
        dst.truncate(mark);
    }
    result
}

pub(crate) const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

pub(crate) fn append_hex(dst: &mut Vec<u8>, val: &[u8]) {
    dst.reserve(val.len() * 2);
    for b in val {
        dst.push(HEX_DIGITS[(b >> 4) as usize]);
        dst.push(HEX_DIGITS[(b & 0x0f) as usize]);
    }
}

/// Shortest representation, switching to exponent form for very small or
/// very large magnitudes. Non-finite values are written as `NaN`, `+Inf` and
/// `-Inf`; quoting them is up to the caller.
pub(crate) fn append_float(dst: &mut Vec<u8>, val: f64, single: bool) {
    if val.is_nan() {
        dst.extend_from_slice(b"NaN");
        return;
    }
    if val.is_infinite() {
        dst.extend_from_slice(if val > 0.0 { b"+Inf" } else { b"-Inf" });
        return;
    }
    let abs = val.abs();
    let exp = abs != 0.0 && (abs < 1e-6 || abs >= 1e21);
    let _ = match (single, exp) {
        (true, true) => write!(dst, "{:e}", val as f32),
        (true, false) => write!(dst, "{}", val as f32),
        (false, true) => write!(dst, "{:e}", val),
        (false, false) => write!(dst, "{}", val),
    };
}
