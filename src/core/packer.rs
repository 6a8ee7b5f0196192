//! Per-destination rendering of a record
//!
//! A packer owns two buffers: `raw` collects fields in call order, `meta` is
//! rebuilt at finalize time from the logger's meta keys. The console variant
//! additionally wraps keys and meta fields in ANSI color sequences.

use super::caller;
use super::level::Level;
use super::logger::{Logger, WriterEncoderPair};
use super::meta::{color_end, color_start, SgrCode, FIELD_KEY_COLOR_KEY, META_END_COLOR_KEY};
use super::marshal::ErrorStack;
use super::error::{LoggerError, Result};
use super::pool::BytesPool;
use crate::encoder::Encoder;
use chrono::{DateTime, Utc};
use colored::Color;
use serde::Serialize;
use std::error::Error as StdError;
use std::panic::Location;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PackerKind {
    Writer,
    Console { color: bool },
}

/// Record state shared by every packer at finalize time.
pub(crate) struct Finish<'a> {
    pub logger: &'a Logger,
    pub level: Level,
    pub label: &'a str,
    pub location: &'static Location<'static>,
    pub now: DateTime<Utc>,
}

pub(crate) struct Packer {
    kind: PackerKind,
    raw: Vec<u8>,
    meta: Vec<u8>,
    caller_skip: usize,
    pair: WriterEncoderPair,
    bytes: Arc<BytesPool>,
    color_key: String,
}

impl Packer {
    pub(crate) fn new(kind: PackerKind, pair: WriterEncoderPair, bytes: Arc<BytesPool>) -> Self {
        Self {
            kind,
            raw: bytes.get(),
            meta: bytes.get(),
            caller_skip: 0,
            pair,
            bytes,
            color_key: String::new(),
        }
    }

    /// Returns both buffers to the pool and takes fresh ones.
    pub(crate) fn reset(&mut self) {
        let raw = std::mem::replace(&mut self.raw, self.bytes.get());
        self.bytes.put(raw);
        let meta = std::mem::replace(&mut self.meta, self.bytes.get());
        self.bytes.put(meta);
        self.caller_skip = 0;
    }

    pub(crate) fn add_caller_skip(&mut self, skip: usize) {
        self.caller_skip += skip;
    }

    fn colors<'l>(&self, logger: &'l Logger, key: &str) -> Option<&'l [SgrCode]> {
        match self.kind {
            PackerKind::Console { color: true } => logger.meta.console_colors(key),
            _ => None,
        }
    }

    /// Appends `key` and the value written by `render`.
    pub(crate) fn field<F>(&mut self, logger: &Logger, key: &str, render: F)
    where
        F: FnOnce(&dyn Encoder, &mut Vec<u8>),
    {
        let colors = self.colors(logger, FIELD_KEY_COLOR_KEY);
        let enc = &*self.pair.encoder;
        wrap(&mut self.raw, colors, |dst| enc.key(dst, key));
        render(enc, &mut self.raw);
    }

    pub(crate) fn msg(&mut self, logger: &Logger, msg: &str) {
        let key = &logger.field_names.message;
        let colors = self.colors(logger, key);
        let enc = &*self.pair.encoder;
        wrap(&mut self.raw, colors, |dst| {
            enc.key(dst, key);
            enc.string(dst, msg);
        });
    }

    /// Error field plus, when `stack` is set and the logger has an
    /// error-stack marshal function, the stack field.
    pub(crate) fn err(&mut self, logger: &Logger, stack: bool, err: &dyn StdError) {
        let names = &logger.field_names;
        let marshal = &logger.marshal;
        let rendered = (marshal.error)(err);
        if rendered.is_empty() {
            return;
        }
        let stack = if stack {
            marshal.error_stack.as_ref().and_then(|f| f(err))
        } else {
            None
        };
        let mut scratch = self.bytes.get();
        let colors = self.colors(logger, &names.error);
        let enc = &*self.pair.encoder;
        wrap(&mut self.raw, colors, |dst| {
            enc.key(dst, &names.error);
            enc.string(dst, &rendered);
            match stack {
                None => {}
                Some(ErrorStack::Text(text)) => {
                    enc.key(dst, &names.stack);
                    enc.string(dst, &text);
                }
                Some(ErrorStack::Value(value)) => {
                    let marshaled = marshal_value(logger, &value, &mut scratch);
                    enc.key(dst, &names.stack);
                    insert_value(enc, dst, &marshaled, &scratch);
                }
            }
        });
        self.bytes.put(scratch);
    }

    /// Renders meta, merges it with the fields and writes the line.
    pub(crate) fn done(&mut self, cx: &Finish<'_>) -> Result<usize> {
        let enc = Arc::clone(&self.pair.encoder);
        enc.end_marker(&mut self.raw);

        self.meta.clear();
        enc.begin_marker(&mut self.meta);
        self.render_meta(cx, &*enc);

        let colors = self.colors(cx.logger, META_END_COLOR_KEY);
        let opened = open(&mut self.meta, colors);
        enc.meta_end(&mut self.meta);
        self.rainbow_end(&*enc, 1, opened);

        enc.object_data(&mut self.meta, &self.raw);
        enc.line_break(&mut self.meta);
        self.pair.writer.write_level(cx.level, &self.meta)
    }

    fn render_meta(&mut self, cx: &Finish<'_>, enc: &dyn Encoder) {
        let logger = cx.logger;
        let names = &logger.field_names;
        for (i, key) in logger.meta.keys().iter().enumerate() {
            if *key == names.meta_time {
                let opened = self.rainbow_start(cx, i, key);
                enc.key(&mut self.meta, key);
                enc.time(&mut self.meta, &logger.time_format, &cx.now);
                self.rainbow_end(enc, i, opened);
            } else if *key == names.meta_label {
                if cx.label.is_empty() {
                    continue;
                }
                let opened = self.rainbow_start(cx, i, key);
                enc.key(&mut self.meta, key);
                enc.string(&mut self.meta, cx.label);
                self.rainbow_end(enc, i, opened);
            } else if *key == names.meta_level {
                let opened = if i == 0 {
                    self.first_meta_start(cx)
                } else {
                    self.level_start(cx)
                };
                enc.key(&mut self.meta, key);
                match self.kind {
                    PackerKind::Console { .. } => match cx.level.abbreviation() {
                        Some(abbr) => enc.string(&mut self.meta, abbr),
                        None => enc.i64(&mut self.meta, cx.level.as_i8() as i64),
                    },
                    PackerKind::Writer => {
                        enc.string(&mut self.meta, &(logger.marshal.level)(cx.level))
                    }
                }
                self.rainbow_end(enc, i, opened);
            } else if *key == names.meta_caller {
                let skip = self.caller_skip + logger.caller_skip;
                let Some(site) = caller::resolve(cx.location, skip) else {
                    continue;
                };
                let opened = self.rainbow_start(cx, i, key);
                enc.key(&mut self.meta, key);
                enc.string(&mut self.meta, &(logger.marshal.caller)(&site.file, site.line));
                self.rainbow_end(enc, i, opened);
            }
        }
    }

    fn is_colored(&self) -> bool {
        matches!(self.kind, PackerKind::Console { color: true })
    }

    fn rainbow_start(&mut self, cx: &Finish<'_>, index: usize, key: &str) -> usize {
        if !self.is_colored() {
            return 0;
        }
        if index == 0 {
            return self.first_meta_start(cx);
        }
        let colors = self.colors(cx.logger, key);
        open(&mut self.meta, colors)
    }

    /// Line badge: the level's line colors on black text.
    fn first_meta_start(&mut self, cx: &Finish<'_>) -> usize {
        if !self.is_colored() {
            return 0;
        }
        let Some(name) = cx.level.name() else {
            return 0;
        };
        cx.logger
            .field_names
            .level_line_color_key(&mut self.color_key, name);
        match cx.logger.meta.console_colors(&self.color_key) {
            Some(colors) => {
                let opened = open(&mut self.meta, Some(colors));
                color_start(&mut self.meta, &SgrCode::fg(Color::Black));
                opened + 1
            }
            None => 0,
        }
    }

    fn level_start(&mut self, cx: &Finish<'_>) -> usize {
        if !self.is_colored() {
            return 0;
        }
        let Some(name) = cx.level.name() else {
            return 0;
        };
        cx.logger.field_names.level_color_key(&mut self.color_key, name);
        let colors = cx.logger.meta.console_colors(&self.color_key);
        open(&mut self.meta, colors)
    }

    fn rainbow_end(&mut self, enc: &dyn Encoder, index: usize, opened: usize) {
        if !self.is_colored() || opened == 0 {
            return;
        }
        if index == 0 {
            enc.blank_space(&mut self.meta);
        }
        for _ in 0..opened {
            color_end(&mut self.meta);
        }
    }
}

/// Opens every color in `colors`, returning how many were opened.
fn open(dst: &mut Vec<u8>, colors: Option<&[SgrCode]>) -> usize {
    match colors {
        Some(colors) => {
            for c in colors {
                color_start(dst, c);
            }
            colors.len()
        }
        None => 0,
    }
}

fn wrap(dst: &mut Vec<u8>, colors: Option<&[SgrCode]>, body: impl FnOnce(&mut Vec<u8>)) {
    let opened = open(dst, colors);
    body(dst);
    for _ in 0..opened {
        color_end(dst);
    }
}

/// Serializes `val` into `dst` with the logger's value marshal function.
pub(crate) fn marshal_value<T: Serialize + ?Sized>(
    logger: &Logger,
    val: &T,
    dst: &mut Vec<u8>,
) -> Result<()> {
    let as_marshal = |e: serde_json::Error| LoggerError::Marshal(e.to_string());
    match &logger.marshal.value {
        None => serde_json::to_writer(&mut *dst, val).map_err(as_marshal),
        Some(marshal) => marshal(&serde_json::to_value(val).map_err(as_marshal)?, dst),
    }
}

/// Inserts a value produced by [`marshal_value`]; failures render inline.
pub(crate) fn insert_value(
    enc: &dyn Encoder,
    dst: &mut Vec<u8>,
    marshaled: &Result<()>,
    rendered: &[u8],
) {
    match marshaled {
        Ok(()) => enc.interface(dst, rendered),
        Err(e @ LoggerError::Marshal(_)) => enc.display(dst, e),
        Err(e) => enc.display(dst, &format_args!("marshaling error: {}", e)),
    }
}
