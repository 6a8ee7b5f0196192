//! The fluent record handle
//!
//! A [`Record`] is taken from its logger's pool, collects fields through
//! chained setters and is finalized by [`Record::done`]. Every setter first
//! checks whether the record is struck (its level is below the logger level
//! or it was discarded); struck records skip all rendering work.
//!
//! A record that is dropped without `done` goes back to the pool silently.

use super::error::LoggerError;
use super::level::Level;
use super::logger::Logger;
use super::packer::{insert_value, marshal_value, Finish, Packer};
use super::time_format::TimeFormat;
use crate::encoder::{encode_array, Encoder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::net::IpAddr;
use std::panic::Location;
use std::time::Duration;

type DoneFunc = Box<dyn FnOnce(&str) + Send>;

/// Pooled part of a record.
pub(crate) struct RecordState {
    pub(crate) level: Level,
    pub(crate) label: String,
    pub(crate) msg: String,
    pub(crate) use_int_dur: bool,
    pub(crate) stack: bool,
    pub(crate) location: Option<&'static Location<'static>>,
    pub(crate) done_func: Option<DoneFunc>,
    pub(crate) packers: Vec<Packer>,
}

impl RecordState {
    pub(crate) fn new(packers: Vec<Packer>) -> Self {
        Self {
            level: Level::DISABLED,
            label: String::new(),
            msg: String::new(),
            use_int_dur: false,
            stack: false,
            location: None,
            done_func: None,
            packers,
        }
    }

    /// Clears per-record data so the state can be handed out again.
    pub(crate) fn reset(&mut self) {
        self.level = Level::DISABLED;
        self.label.clear();
        self.msg.clear();
        self.use_int_dur = false;
        self.stack = false;
        self.location = None;
        self.done_func = None;
        for packer in &mut self.packers {
            packer.reset();
        }
    }

    #[inline]
    fn is_struck(&self, min: Level) -> bool {
        self.level == Level::DISABLED || self.level < min
    }
}

/// A log record under construction.
///
/// ```
/// use chromalog::{JsonEncoder, LoggerBuilder, MemoryWriter};
/// use std::sync::Arc;
///
/// let out = MemoryWriter::new();
/// let logger = LoggerBuilder::new()
///     .meta_keys(["META_LEVEL"])
///     .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
///     .build();
///
/// logger.info().str("user", "ada").u16("port", 8080).msg("connected").done();
/// assert_eq!(
///     out.contents_string(),
///     "{\"META_LEVEL\":\"INFO\",\"user\":\"ada\",\"port\":8080,\"message\":\"connected\"}\n"
/// );
/// ```
#[must_use = "a record does nothing until `done` is called"]
pub struct Record<'a> {
    logger: &'a Logger,
    state: Option<Box<RecordState>>,
}

macro_rules! int_setters {
    ($($one:ident, $many:ident: $ty:ty => $method:ident as $wide:ty;)*) => {$(
        pub fn $one(self, key: &str, val: $ty) -> Self {
            self.field(key, |enc, dst| enc.$method(dst, val as $wide))
        }

        pub fn $many(self, key: &str, vals: &[$ty]) -> Self {
            self.field(key, |enc, dst| {
                encode_array(enc, dst, vals, |enc, dst, v| enc.$method(dst, *v as $wide))
            })
        }
    )*};
}

impl<'a> Record<'a> {
    pub(crate) fn new(logger: &'a Logger, location: &'static Location<'static>) -> Self {
        if logger.level == Level::DISABLED {
            return Self {
                logger,
                state: None,
            };
        }
        let (mut state, created) = logger.records.get_or_create();
        if created {
            logger.metrics.record_allocated();
        }
        state.label.push_str(&logger.label);
        state.stack = logger.stack;
        state.use_int_dur = logger.duration_int;
        state.location = Some(location);
        Self {
            logger,
            state: Some(state),
        }
    }

    /// The state, unless the record is struck.
    #[inline]
    fn active(&mut self) -> Option<&mut RecordState> {
        let min = self.logger.level;
        self.state.as_deref_mut().filter(|s| !s.is_struck(min))
    }

    #[inline]
    fn field<F>(mut self, key: &str, render: F) -> Self
    where
        F: Fn(&dyn Encoder, &mut Vec<u8>),
    {
        let logger = self.logger;
        if let Some(state) = self.active() {
            for packer in &mut state.packers {
                packer.field(logger, key, &render);
            }
        }
        self
    }

    pub fn level(&self) -> Level {
        self.state.as_ref().map_or(Level::DISABLED, |s| s.level)
    }

    pub fn label(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.label.as_str())
    }

    /// The message set so far; empty for struck records.
    pub fn message(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.msg.as_str())
    }

    pub fn is_struck(&self) -> bool {
        self.state
            .as_ref()
            .map_or(true, |s| s.is_struck(self.logger.level))
    }

    pub fn is_enabled(&self) -> bool {
        !self.is_struck()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        if let Some(state) = self.state.as_deref_mut() {
            state.level = level;
        }
        self
    }

    /// Overrides the label meta field; empty labels are omitted.
    pub fn with_label(mut self, label: &str) -> Self {
        if let Some(state) = self.state.as_deref_mut() {
            state.label.clear();
            state.label.push_str(label);
        }
        self
    }

    /// Callback run by `done` with the final message, even when struck.
    pub fn with_done_func<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&str) + Send + 'static,
    {
        if let Some(state) = self.state.as_deref_mut() {
            state.done_func = Some(Box::new(f));
        }
        self
    }

    /// Skips `skip` more frames when resolving the caller field.
    pub fn with_caller_skip(mut self, skip: usize) -> Self {
        if let Some(state) = self.state.as_deref_mut() {
            for packer in &mut state.packers {
                packer.add_caller_skip(skip);
            }
        }
        self
    }

    /// Replaces the call site captured when the record was created.
    pub fn with_caller(mut self, location: &'static Location<'static>) -> Self {
        if let Some(state) = self.state.as_deref_mut() {
            state.location = Some(location);
        }
        self
    }

    /// Render durations with their fractional part dropped.
    pub fn use_int_dur(mut self) -> Self {
        if let Some(state) = self.state.as_deref_mut() {
            state.use_int_dur = true;
        }
        self
    }

    /// Strikes the record: nothing more is rendered and `done` writes nothing.
    pub fn discard(self) -> Self {
        self.with_level(Level::DISABLED)
    }

    /// Sets the message field. Empty messages are skipped.
    pub fn msg(mut self, msg: &str) -> Self {
        let logger = self.logger;
        if msg.is_empty() {
            return self;
        }
        if let Some(state) = self.active() {
            state.msg.clear();
            state.msg.push_str(msg);
            for packer in &mut state.packers {
                packer.msg(logger, msg);
            }
        }
        self
    }

    /// Formats the message into the record's reusable buffer. A failing
    /// `Display` impl is reported to the error handler and the message keeps
    /// whatever was formatted before the failure.
    pub fn msgf(mut self, args: fmt::Arguments<'_>) -> Self {
        let logger = self.logger;
        if let Some(state) = self.active() {
            state.msg.clear();
            if state.msg.write_fmt(args).is_err() {
                (logger.error_handler)(&LoggerError::other("formatting the message failed"));
            }
            if state.msg.is_empty() {
                return self;
            }
            let RecordState { msg, packers, .. } = state;
            for packer in packers.iter_mut() {
                packer.msg(logger, msg.as_str());
            }
        }
        self
    }

    /// Error field, plus a stack field when stacks are enabled.
    pub fn err(mut self, err: &dyn StdError) -> Self {
        let logger = self.logger;
        if let Some(state) = self.active() {
            let stack = state.stack;
            for packer in &mut state.packers {
                packer.err(logger, stack, err);
            }
        }
        self
    }

    pub fn str(self, key: &str, val: &str) -> Self {
        self.field(key, |enc, dst| enc.string(dst, val))
    }

    pub fn strs<S: AsRef<str>>(self, key: &str, vals: &[S]) -> Self {
        self.field(key, |enc, dst| {
            encode_array(enc, dst, vals, |enc, dst, v| enc.string(dst, v.as_ref()))
        })
    }

    pub fn stringer(self, key: &str, val: &dyn fmt::Display) -> Self {
        self.field(key, |enc, dst| enc.display(dst, val))
    }

    pub fn stringers<T: fmt::Display>(self, key: &str, vals: &[T]) -> Self {
        self.field(key, |enc, dst| {
            encode_array(enc, dst, vals, |enc, dst, v| enc.display(dst, v))
        })
    }

    pub fn bytes(self, key: &str, val: &[u8]) -> Self {
        self.field(key, |enc, dst| enc.bytes(dst, val))
    }

    /// Bytes rendered as lowercase hex.
    pub fn hex(self, key: &str, val: &[u8]) -> Self {
        self.field(key, |enc, dst| enc.hex(dst, val))
    }

    int_setters! {
        i8, i8s: i8 => i64 as i64;
        i16, i16s: i16 => i64 as i64;
        i32, i32s: i32 => i64 as i64;
        i64, i64s: i64 => i64 as i64;
        isize, isizes: isize => i64 as i64;
        u8, u8s: u8 => u64 as u64;
        u16, u16s: u16 => u64 as u64;
        u32, u32s: u32 => u64 as u64;
        u64, u64s: u64 => u64 as u64;
        usize, usizes: usize => u64 as u64;
    }

    pub fn f32(self, key: &str, val: f32) -> Self {
        self.field(key, |enc, dst| enc.f32(dst, val))
    }

    pub fn f32s(self, key: &str, vals: &[f32]) -> Self {
        self.field(key, |enc, dst| {
            encode_array(enc, dst, vals, |enc, dst, v| enc.f32(dst, *v))
        })
    }

    pub fn f64(self, key: &str, val: f64) -> Self {
        self.field(key, |enc, dst| enc.f64(dst, val))
    }

    pub fn f64s(self, key: &str, vals: &[f64]) -> Self {
        self.field(key, |enc, dst| {
            encode_array(enc, dst, vals, |enc, dst, v| enc.f64(dst, *v))
        })
    }

    pub fn bool(self, key: &str, val: bool) -> Self {
        self.field(key, |enc, dst| enc.bool(dst, val))
    }

    pub fn bools(self, key: &str, vals: &[bool]) -> Self {
        self.field(key, |enc, dst| {
            encode_array(enc, dst, vals, |enc, dst, v| enc.bool(dst, *v))
        })
    }

    pub fn nil(self, key: &str) -> Self {
        self.field(key, |enc, dst| enc.nil(dst))
    }

    pub fn time(self, key: &str, format: &TimeFormat, val: &DateTime<Utc>) -> Self {
        self.field(key, |enc, dst| enc.time(dst, format, val))
    }

    pub fn times(self, key: &str, format: &TimeFormat, vals: &[DateTime<Utc>]) -> Self {
        self.field(key, |enc, dst| {
            encode_array(enc, dst, vals, |enc, dst, v| enc.time(dst, format, v))
        })
    }

    /// `val` expressed in multiples of `unit`.
    pub fn dur(self, key: &str, unit: Duration, val: Duration) -> Self {
        let use_int = self.state.as_ref().is_some_and(|s| s.use_int_dur);
        self.field(key, |enc, dst| enc.duration(dst, unit, use_int, val))
    }

    pub fn durs(self, key: &str, unit: Duration, vals: &[Duration]) -> Self {
        let use_int = self.state.as_ref().is_some_and(|s| s.use_int_dur);
        self.field(key, |enc, dst| {
            encode_array(enc, dst, vals, |enc, dst, v| {
                enc.duration(dst, unit, use_int, *v)
            })
        })
    }

    /// Any serializable value, rendered through the logger's value marshal
    /// function. Failures render as `marshaling error: ...`.
    pub fn value<T: Serialize + ?Sized>(self, key: &str, val: &T) -> Self {
        if self.is_struck() {
            return self;
        }
        let logger = self.logger;
        let mut scratch = logger.bytes_pool.get();
        let marshaled = marshal_value(logger, val, &mut scratch);
        let record = self.field(key, |enc, dst| insert_value(enc, dst, &marshaled, &scratch));
        logger.bytes_pool.put(scratch);
        record
    }

    /// Alias of [`Record::value`].
    pub fn any<T: Serialize + ?Sized>(self, key: &str, val: &T) -> Self {
        self.value(key, val)
    }

    pub fn ip_addr(self, key: &str, val: &IpAddr) -> Self {
        self.field(key, |enc, dst| enc.ip_addr(dst, val))
    }

    pub fn ip_prefix(self, key: &str, val: &ipnet::IpNet) -> Self {
        self.field(key, |enc, dst| enc.ip_prefix(dst, val))
    }

    pub fn mac_addr(self, key: &str, val: &[u8]) -> Self {
        self.field(key, |enc, dst| enc.mac_addr(dst, val))
    }

    /// Finalizes the record.
    ///
    /// Hooks run first and see every record. Records that are not struck are
    /// then written to each destination; write failures go to the logger's
    /// error handler. The done callback runs next, then the record returns to
    /// the pool. A fatal record flushes the logger's writers and calls its
    /// exit function; a panic record panics with its message.
    pub fn done(mut self) {
        let logger = self.logger;
        if let Some(state) = self.state.as_deref() {
            for hook in &logger.hooks {
                hook.run_hook(&self, state.level, &state.msg);
            }
        }
        let Some(mut state) = self.state.take() else {
            return;
        };

        let struck = state.is_struck(logger.level);
        let level = state.level;
        if struck {
            logger.metrics.record_struck();
        } else {
            let RecordState {
                label,
                location,
                packers,
                ..
            } = &mut *state;
            let cx = Finish {
                logger,
                level,
                label: label.as_str(),
                location: location.unwrap_or_else(Location::caller),
                now: (logger.clock)(),
            };
            for packer in packers.iter_mut() {
                if let Err(e) = packer.done(&cx) {
                    logger.metrics.record_write_error();
                    (logger.error_handler)(&e);
                }
            }
            logger.metrics.record_emitted();
        }

        if let Some(done_func) = state.done_func.take() {
            done_func(&state.msg);
        }

        let panic_msg = if !struck && level == Level::PANIC {
            Some(std::mem::take(&mut state.msg))
        } else {
            None
        };
        logger.records.put(state);

        if struck {
            return;
        }
        if level == Level::FATAL {
            logger.flush_writers();
            (logger.exit_func)(1);
        } else if let Some(msg) = panic_msg {
            if msg.is_empty() {
                panic!("panic");
            }
            panic!("{}", msg);
        }
    }
}

impl Drop for Record<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.logger.records.put(state);
        }
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("level", &self.level())
            .field("label", &self.label())
            .field("struck", &self.is_struck())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logger::LoggerBuilder;
    use crate::encoder::{JsonEncoder, TextEncoder};
    use crate::writers::MemoryWriter;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn json_logger(out: &MemoryWriter) -> Logger {
        LoggerBuilder::new()
            .meta_keys(["META_LEVEL"])
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .build()
    }

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl StdError for Boom {}

    #[test]
    fn test_json_fields_in_call_order() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);

        logger
            .info()
            .str("s", "a\"b")
            .i32("n", -3)
            .u8s("bytes", &[1, 2])
            .bool("ok", true)
            .nil("none")
            .f64("ratio", 0.5)
            .msg("hello")
            .done();

        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"INFO\",\"s\":\"a\\\"b\",\"n\":-3,\"bytes\":[1,2],\"ok\":true,\"none\":null,\"ratio\":0.5,\"message\":\"hello\"}\n"
        );
    }

    #[test]
    fn test_struck_record_writes_nothing() {
        let out = MemoryWriter::new();
        let logger = LoggerBuilder::new()
            .level(Level::WARN)
            .meta_keys(["META_LEVEL"])
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .build();

        logger.info().str("k", "v").msg("dropped").done();
        assert!(out.is_empty());
        assert_eq!(logger.metrics().records_struck(), 1);
    }

    #[test]
    fn test_discard() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);
        let record = logger.error().str("k", "v").discard();
        assert!(record.is_struck());
        record.msg("never").done();
        assert!(out.is_empty());
    }

    #[test]
    fn test_plain_record_is_disabled_until_leveled() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);

        logger.record().str("lost", "x").done();
        assert!(out.is_empty());

        logger.record().with_level(Level::WARN).msg("kept").done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"WARN\",\"message\":\"kept\"}\n"
        );
    }

    #[test]
    fn test_empty_message_is_skipped() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);
        logger.info().msg("").done();
        logger.info().msgf(format_args!("")).done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"INFO\"}\n{\"META_LEVEL\":\"INFO\"}\n"
        );
    }

    #[test]
    fn test_msgf() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);
        let record = logger.debug().msgf(format_args!("{} + {}", 1, 2));
        assert_eq!(record.message(), "1 + 2");
        record.done();
        assert!(out.contents_string().ends_with("\"message\":\"1 + 2\"}\n"));
    }

    #[test]
    fn test_msgf_reports_formatting_failure() {
        struct Truncated;

        impl fmt::Display for Truncated {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("half")?;
                Err(fmt::Error)
            }
        }

        let out = MemoryWriter::new();
        let errors = Arc::new(AtomicI32::new(0));
        let seen = Arc::clone(&errors);
        let logger = LoggerBuilder::new()
            .meta_keys(["META_LEVEL"])
            .error_handler(move |e: &LoggerError| {
                assert!(e.to_string().contains("formatting"));
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .build();

        logger.info().msgf(format_args!("{} {}", "first", Truncated)).done();
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"INFO\",\"message\":\"first half\"}\n"
        );
    }

    #[test]
    fn test_err_with_stack() {
        let out = MemoryWriter::new();
        let logger = LoggerBuilder::new()
            .meta_keys(["META_LEVEL"])
            .stack(true)
            .error_stack_marshal(|_err: &dyn StdError| {
                Some(crate::core::marshal::ErrorStack::Text("frame0".to_string()))
            })
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .build();

        logger.error().err(&Boom).done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"ERROR\",\"error\":\"boom\",\"stack\":\"frame0\"}\n"
        );
    }

    #[test]
    fn test_err_without_stack() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);
        logger.error().err(&Boom).done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"ERROR\",\"error\":\"boom\"}\n"
        );
    }

    #[test]
    fn test_value_and_marshal_failure() {
        use std::collections::HashMap;

        let out = MemoryWriter::new();
        let logger = json_logger(&out);

        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "non-string key");

        logger
            .info()
            .value("user", &serde_json::json!({"id": 7}))
            .any("bad", &bad)
            .done();

        let line = out.contents_string();
        assert!(line.starts_with("{\"META_LEVEL\":\"INFO\",\"user\":{\"id\":7},\"bad\":\"marshaling error: "));
    }

    #[test]
    fn test_value_goes_through_encoder_interface() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        let out = MemoryWriter::new();
        let logger = LoggerBuilder::new()
            .meta_keys(["META_LEVEL"])
            .encoder_writer_pair(Arc::new(TextEncoder::default()), Arc::new(out.clone()))
            .build();
        logger.info().value("at", &Point { x: 1, y: -2 }).any("tags", &["a", "b"]).done();
        assert_eq!(out.contents_string(), "INFO > at={\"x\":1,\"y\":-2} tags=[\"a\",\"b\"]\n");

        let out = MemoryWriter::new();
        let logger = LoggerBuilder::new()
            .meta_keys(["META_LEVEL"])
            .value_marshal(|value: &serde_json::Value, dst: &mut Vec<u8>| {
                let fields = value.as_object().map_or(0, |o| o.len());
                dst.extend_from_slice(fields.to_string().as_bytes());
                Ok(())
            })
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .build();
        logger.info().value("at", &Point { x: 1, y: -2 }).done();
        assert_eq!(out.contents_string(), "{\"META_LEVEL\":\"INFO\",\"at\":2}\n");
    }

    #[test]
    fn test_durations() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);
        logger
            .info()
            .dur("float", Duration::from_millis(1), Duration::from_micros(1500))
            .use_int_dur()
            .dur("int", Duration::from_millis(1), Duration::from_micros(1500))
            .done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"INFO\",\"float\":1.5,\"int\":1}\n"
        );
    }

    #[test]
    fn test_time_field() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        logger
            .info()
            .time("at", &TimeFormat::Unix, &at)
            .times("seen", &TimeFormat::Layout("%Y".to_string()), &[at])
            .done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"INFO\",\"at\":1704164645,\"seen\":[\"2024\"]}\n"
        );
    }

    #[test]
    fn test_unrenderable_layout_does_not_panic() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let broken = TimeFormat::Layout("%".to_string());

        let out = MemoryWriter::new();
        json_logger(&out).info().time("at", &broken, &at).msg("x").done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"INFO\",\"at\":\"2024-01-02T03:04:05+00:00\",\"message\":\"x\"}\n"
        );

        let out = MemoryWriter::new();
        let logger = LoggerBuilder::new()
            .meta_keys(["META_LEVEL", "message"])
            .encoder_writer_pair(Arc::new(TextEncoder::default()), Arc::new(out.clone()))
            .build();
        logger.info().times("at", &broken, &[at]).msg("x").done();
        assert_eq!(
            out.contents_string(),
            "INFO > at=[2024-01-02T03:04:05+00:00] x\n"
        );
    }

    #[test]
    fn test_text_label_override() {
        let out = MemoryWriter::new();
        let logger = LoggerBuilder::new()
            .meta_keys(["META_LEVEL", "META_LABEL", "message"])
            .label("svc")
            .encoder_writer_pair(Arc::new(TextEncoder::default()), Arc::new(out.clone()))
            .build();

        logger.info().msg("a").done();
        logger.info().with_label("").msg("b").done();
        logger.info().with_label("job").msg("c").done();

        assert_eq!(
            out.contents_string(),
            "INFO svc > a\nINFO > b\nINFO job > c\n"
        );
    }

    #[test]
    fn test_done_func_receives_message() {
        let logger = LoggerBuilder::new().level(Level::ERROR).build();
        let calls = Arc::new(AtomicI32::new(0));

        let seen = Arc::clone(&calls);
        logger
            .error()
            .msg("bye")
            .with_done_func(move |msg| {
                assert_eq!(msg, "bye");
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .done();

        // struck records still run the callback
        let seen = Arc::clone(&calls);
        logger
            .info()
            .with_done_func(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .done();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fatal_flushes_and_exits() {
        let out = MemoryWriter::new();
        let code = Arc::new(AtomicI32::new(-1));
        let seen = Arc::clone(&code);
        let logger = LoggerBuilder::new()
            .meta_keys(["META_LEVEL"])
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .exit_func(move |c| seen.store(c, Ordering::SeqCst))
            .build();

        logger.fatal().msg("dead").done();
        assert_eq!(code.load(Ordering::SeqCst), 1);
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"FATAL\",\"message\":\"dead\"}\n"
        );
    }

    #[test]
    #[should_panic(expected = "kaboom")]
    fn test_panic_record_panics() {
        let logger = LoggerBuilder::new().build();
        logger.panic().msg("kaboom").done();
    }

    #[test]
    fn test_dropped_record_returns_to_pool() {
        let logger = LoggerBuilder::new().build();
        {
            let _record = logger.info().str("k", "v");
        }
        let _again = logger.info();
        assert_eq!(logger.metrics().records_allocated(), 1);
    }

    #[test]
    fn test_disabled_logger_hands_out_inert_records() {
        let out = MemoryWriter::new();
        let logger = LoggerBuilder::new()
            .level(Level::DISABLED)
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .build();
        let record = logger.panic().msg("nothing");
        assert!(record.is_struck());
        assert_eq!(record.level(), Level::DISABLED);
        record.done();
        assert!(out.is_empty());
    }

    #[test]
    fn test_network_fields() {
        let out = MemoryWriter::new();
        let logger = json_logger(&out);
        let net: ipnet::IpNet = "10.0.0.0/8".parse().unwrap();
        logger
            .info()
            .ip_addr("ip", &"127.0.0.1".parse().unwrap())
            .ip_prefix("net", &net)
            .mac_addr("mac", &[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01])
            .hex("id", &[0x00, 0xff, 0x1a])
            .done();
        assert_eq!(
            out.contents_string(),
            "{\"META_LEVEL\":\"INFO\",\"ip\":\"127.0.0.1\",\"net\":\"10.0.0.0/8\",\"mac\":\"de:ad:be:ef:00:01\",\"id\":\"00ff1a\"}\n"
        );
    }
}
