//! Main logger implementation

use super::error::{LoggerError, Result};
use super::hook::Hook;
use super::level::Level;
use super::marshal::{
    default_clock, default_error_handler, default_exit_func, ClockFn, ErrorHandler, ErrorStack,
    ExitFunc, MarshalFuncs,
};
use super::meta::{FieldNames, MetaKeys, SgrCode};
use super::metrics::LoggerMetrics;
use super::packer::{Packer, PackerKind};
use super::pool::{BytesPool, Pool};
use super::record::{Record, RecordState};
use super::time_format::TimeFormat;
use crate::encoder::{Encoder, TextEncoder};
use crate::writers::{LevelWriter, LevelWriterAdapter, MultiLevelWriter};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// A destination: where bytes go and how a record is encoded for it.
#[derive(Clone)]
pub struct WriterEncoderPair {
    pub writer: Arc<dyn LevelWriter>,
    pub encoder: Arc<dyn Encoder>,
}

impl WriterEncoderPair {
    pub fn new(encoder: Arc<dyn Encoder>, writer: Arc<dyn LevelWriter>) -> Self {
        Self { writer, encoder }
    }

    fn bind(&self, meta_keys: &[String]) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            encoder: self
                .encoder
                .rebind_meta_keys(meta_keys)
                .unwrap_or_else(|| Arc::clone(&self.encoder)),
        }
    }
}

impl fmt::Debug for WriterEncoderPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterEncoderPair")
            .field("encoder", &self.encoder.name())
            .finish_non_exhaustive()
    }
}

/// Structured logger fanning records out to encoder/writer pairs.
///
/// Loggers are immutable once built; derive variants with
/// [`Logger::sub_logger`]. All methods take `&self` and the logger can be
/// shared across threads.
///
/// # Example
///
/// ```
/// use chromalog::{JsonEncoder, Level, LoggerBuilder, MemoryWriter, TextEncoder};
/// use std::sync::Arc;
///
/// let json = MemoryWriter::new();
/// let text = MemoryWriter::new();
/// let logger = LoggerBuilder::new()
///     .level(Level::INFO)
///     .meta_keys(["META_LEVEL", "message"])
///     .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(json.clone()))
///     .encoder_writer_pair(Arc::new(TextEncoder::new()), Arc::new(text.clone()))
///     .build();
///
/// logger.info().msg("hello").done();
/// logger.debug().msg("hidden").done();
///
/// assert_eq!(json.contents_string(), "{\"META_LEVEL\":\"INFO\",\"message\":\"hello\"}\n");
/// assert_eq!(text.contents_string(), "INFO > hello\n");
/// ```
pub struct Logger {
    pub(crate) level: Level,
    pub(crate) label: String,
    pub(crate) stack: bool,
    pub(crate) meta: MetaKeys,
    pub(crate) field_names: FieldNames,
    pub(crate) console_print: bool,
    pub(crate) rainbow_console: bool,
    pub(crate) console_writer: Arc<dyn LevelWriter>,
    pub(crate) writers: Arc<Vec<WriterEncoderPair>>,
    pub(crate) hooks: Vec<Arc<dyn Hook>>,
    pub(crate) marshal: MarshalFuncs,
    pub(crate) time_format: TimeFormat,
    pub(crate) caller_skip: usize,
    pub(crate) duration_int: bool,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) exit_func: ExitFunc,
    pub(crate) clock: ClockFn,
    pub(crate) bytes_pool: Arc<BytesPool>,
    pub(crate) records: Pool<Box<RecordState>>,
    pub(crate) metrics: Arc<LoggerMetrics>,
}

impl Logger {
    /// A builder with no meta keys, no destinations and level DEBUG.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// A builder seeded with this logger's settings.
    ///
    /// The meta key registry is copied, so changes on the child never reach
    /// the parent. The destination list is shared until the child adds one.
    pub fn sub_logger(&self) -> LoggerBuilder {
        LoggerBuilder {
            level: self.level,
            label: self.label.clone(),
            stack: self.stack,
            meta: self.meta.clone(),
            field_names: self.field_names.clone(),
            console_print: self.console_print,
            rainbow_console: self.rainbow_console,
            console_writer: Arc::clone(&self.console_writer),
            writers: Arc::clone(&self.writers),
            hooks: self.hooks.clone(),
            marshal: self.marshal.clone(),
            time_format: self.time_format.clone(),
            caller_skip: self.caller_skip,
            duration_int: self.duration_int,
            error_handler: Arc::clone(&self.error_handler),
            exit_func: Arc::clone(&self.exit_func),
            clock: Arc::clone(&self.clock),
            bytes_pool: Arc::clone(&self.bytes_pool),
        }
    }

    /// A record at level DISABLED carrying the logger label. Set a level with
    /// [`Record::with_level`] or nothing is written.
    #[track_caller]
    pub fn record(&self) -> Record<'_> {
        Record::new(self, Location::caller())
    }

    #[track_caller]
    pub fn level(&self, level: Level) -> Record<'_> {
        Record::new(self, Location::caller()).with_level(level)
    }

    #[track_caller]
    pub fn trace(&self) -> Record<'_> {
        self.level(Level::TRACE)
    }

    #[track_caller]
    pub fn debug(&self) -> Record<'_> {
        self.level(Level::DEBUG)
    }

    #[track_caller]
    pub fn info(&self) -> Record<'_> {
        self.level(Level::INFO)
    }

    #[track_caller]
    pub fn warn(&self) -> Record<'_> {
        self.level(Level::WARN)
    }

    #[track_caller]
    pub fn error(&self) -> Record<'_> {
        self.level(Level::ERROR)
    }

    /// Finalizing a fatal record calls the exit function.
    #[track_caller]
    pub fn fatal(&self) -> Record<'_> {
        self.level(Level::FATAL)
    }

    /// Finalizing a panic record panics with its message.
    #[track_caller]
    pub fn panic(&self) -> Record<'_> {
        self.level(Level::PANIC)
    }

    /// The minimum level written by this logger.
    pub fn min_level(&self) -> Level {
        self.level
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level != Level::DISABLED && self.level != Level::DISABLED && level >= self.level
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn meta_keys(&self) -> &MetaKeys {
        &self.meta
    }

    pub fn field_names(&self) -> &FieldNames {
        &self.field_names
    }

    pub fn writers(&self) -> &[WriterEncoderPair] {
        &self.writers
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Flushes every destination (and the console when printing to it),
    /// returning the first failure.
    pub fn flush(&self) -> Result<()> {
        let mut first_err = None;
        for pair in self.writers.iter() {
            if let Err(e) = pair.writer.flush() {
                first_err.get_or_insert(e);
            }
        }
        if self.console_print {
            if let Err(e) = self.console_writer.flush() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Flush on the fatal path: failures go to the error handler.
    pub(crate) fn flush_writers(&self) {
        for pair in self.writers.iter() {
            if let Err(e) = pair.writer.flush() {
                (self.error_handler)(&e);
            }
        }
        if self.console_print {
            if let Err(e) = self.console_writer.flush() {
                (self.error_handler)(&e);
            }
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("label", &self.label)
            .field("meta", &self.meta.keys())
            .field("writers", &self.writers.len())
            .field("console_print", &self.console_print)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Logger`]
///
/// # Example
/// ```
/// use chromalog::prelude::*;
/// use std::sync::Arc;
///
/// let logger = LoggerBuilder::new()
///     .with_defaults()
///     .level(Level::INFO)
///     .label("api")
///     .encoder_writers(Arc::new(JsonEncoder), vec![Arc::new(MemoryWriter::new())])
///     .build();
/// assert_eq!(logger.min_level(), Level::INFO);
/// ```
pub struct LoggerBuilder {
    level: Level,
    label: String,
    stack: bool,
    meta: MetaKeys,
    field_names: FieldNames,
    console_print: bool,
    rainbow_console: bool,
    console_writer: Arc<dyn LevelWriter>,
    writers: Arc<Vec<WriterEncoderPair>>,
    hooks: Vec<Arc<dyn Hook>>,
    marshal: MarshalFuncs,
    time_format: TimeFormat,
    caller_skip: usize,
    duration_int: bool,
    error_handler: ErrorHandler,
    exit_func: ExitFunc,
    clock: ClockFn,
    bytes_pool: Arc<BytesPool>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: Level::DEBUG,
            label: String::new(),
            stack: false,
            meta: MetaKeys::new(),
            field_names: FieldNames::default(),
            console_print: false,
            rainbow_console: false,
            console_writer: Arc::new(LevelWriterAdapter::stdout()),
            writers: Arc::new(Vec::new()),
            hooks: Vec::new(),
            marshal: MarshalFuncs::default(),
            time_format: TimeFormat::default(),
            caller_skip: 0,
            duration_int: false,
            error_handler: default_error_handler(),
            exit_func: default_exit_func(),
            clock: default_clock(),
            bytes_pool: Arc::new(BytesPool::default()),
        }
    }

    /// Level DEBUG, no label, no stacks, the default meta keys and palette
    /// (built from the current field names), no console printing with colors
    /// enabled for when it is turned on, default marshal functions and time
    /// format.
    #[must_use = "builder methods return a new value"]
    pub fn with_defaults(mut self) -> Self {
        self.level = Level::DEBUG;
        self.label.clear();
        self.stack = false;
        self.meta = MetaKeys::with_defaults(&self.field_names);
        self.console_print = false;
        self.rainbow_console = true;
        self.marshal = MarshalFuncs::default();
        self.time_format = TimeFormat::default();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Render a stack field next to errors, when an error-stack marshal
    /// function is set.
    #[must_use = "builder methods return a new value"]
    pub fn stack(mut self, enabled: bool) -> Self {
        self.stack = enabled;
        self
    }

    /// Replaces the ordered meta key list; colors are kept.
    #[must_use = "builder methods return a new value"]
    pub fn meta_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.set_keys(keys);
        self
    }

    /// Console colors for a meta key or color key such as `META_LEVEL_INFO`.
    #[must_use = "builder methods return a new value"]
    pub fn meta_key_colors(mut self, key: &str, colors: Vec<SgrCode>) -> Self {
        self.meta.set_key_colors(key, colors);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn console_print(mut self, enabled: bool) -> Self {
        self.console_print = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn rainbow_console(mut self, enabled: bool) -> Self {
        self.rainbow_console = enabled;
        self
    }

    /// Where console output goes; stdout unless set.
    #[must_use = "builder methods return a new value"]
    pub fn console_writer(mut self, writer: Arc<dyn LevelWriter>) -> Self {
        self.console_writer = writer;
        self
    }

    /// Adds one destination rendering with `encoder` into all `writers`.
    /// Several writers are combined with a [`MultiLevelWriter`]; an empty
    /// list adds nothing.
    #[must_use = "builder methods return a new value"]
    pub fn encoder_writers(
        self,
        encoder: Arc<dyn Encoder>,
        mut writers: Vec<Arc<dyn LevelWriter>>,
    ) -> Self {
        let writer: Arc<dyn LevelWriter> = match writers.len() {
            0 => return self,
            1 => writers.remove(0),
            _ => Arc::new(MultiLevelWriter::new(writers)),
        };
        self.encoder_writer_pair(encoder, writer)
    }

    #[must_use = "builder methods return a new value"]
    pub fn encoder_writer_pair(
        mut self,
        encoder: Arc<dyn Encoder>,
        writer: Arc<dyn LevelWriter>,
    ) -> Self {
        Arc::make_mut(&mut self.writers).push(WriterEncoderPair::new(encoder, writer));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn hook<H: Hook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level_field_marshal<F>(mut self, f: F) -> Self
    where
        F: Fn(Level) -> Cow<'static, str> + Send + Sync + 'static,
    {
        self.marshal.level = Arc::new(f);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn caller_marshal<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u32) -> String + Send + Sync + 'static,
    {
        self.marshal.caller = Arc::new(f);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_marshal<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn StdError) -> String + Send + Sync + 'static,
    {
        self.marshal.error = Arc::new(f);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_stack_marshal<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn StdError) -> Option<ErrorStack> + Send + Sync + 'static,
    {
        self.marshal.error_stack = Some(Arc::new(f));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn value_marshal<F>(mut self, f: F) -> Self
    where
        F: Fn(&serde_json::Value, &mut Vec<u8>) -> Result<()> + Send + Sync + 'static,
    {
        self.marshal.value = Some(Arc::new(f));
        self
    }

    /// Format of the meta time field, as a selector: `""`, `"UNIXMS"`,
    /// `"UNIXMICRO"`, `"UNIXNANO"` or a strftime layout.
    ///
    /// # Errors
    ///
    /// [`LoggerError::InvalidConfiguration`] for a layout chrono cannot render.
    pub fn time_format(mut self, selector: &str) -> Result<Self> {
        self.time_format = TimeFormat::parse(selector)?;
        Ok(self)
    }

    /// Renames the built-in keys. Set before [`LoggerBuilder::with_defaults`]
    /// so the default meta keys pick the names up.
    #[must_use = "builder methods return a new value"]
    pub fn field_names(mut self, names: FieldNames) -> Self {
        self.field_names = names;
        self
    }

    /// Frames to skip above the call site when resolving the caller field.
    #[must_use = "builder methods return a new value"]
    pub fn caller_skip(mut self, skip: usize) -> Self {
        self.caller_skip = skip;
        self
    }

    /// Render durations as integers by default.
    #[must_use = "builder methods return a new value"]
    pub fn duration_int(mut self, enabled: bool) -> Self {
        self.duration_int = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoggerError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(f);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn exit_func<F>(mut self, f: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit_func = Arc::new(f);
        self
    }

    /// Source of the meta time field.
    #[must_use = "builder methods return a new value"]
    pub fn clock<F>(mut self, f: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(f);
        self
    }

    /// Buffer pool shared with other loggers.
    #[must_use = "builder methods return a new value"]
    pub fn bytes_pool(mut self, pool: Arc<BytesPool>) -> Self {
        self.bytes_pool = pool;
        self
    }

    pub fn build(self) -> Logger {
        let keys = self.meta.keys();
        let bound: Vec<WriterEncoderPair> = self.writers.iter().map(|p| p.bind(keys)).collect();
        let console = self.console_print.then(|| {
            WriterEncoderPair::new(
                Arc::new(TextEncoder::with_meta_keys(keys.iter().cloned())),
                Arc::clone(&self.console_writer),
            )
        });
        let console_kind = PackerKind::Console {
            color: self.rainbow_console,
        };

        let bytes = Arc::clone(&self.bytes_pool);
        let records = Pool::new(
            move || {
                let mut packers: Vec<Packer> = bound
                    .iter()
                    .map(|pair| Packer::new(PackerKind::Writer, pair.clone(), Arc::clone(&bytes)))
                    .collect();
                if let Some(pair) = &console {
                    packers.push(Packer::new(console_kind, pair.clone(), Arc::clone(&bytes)));
                }
                Box::new(RecordState::new(packers))
            },
            |state: &mut Box<RecordState>| {
                state.reset();
                true
            },
        );

        Logger {
            level: self.level,
            label: self.label,
            stack: self.stack,
            meta: self.meta,
            field_names: self.field_names,
            console_print: self.console_print,
            rainbow_console: self.rainbow_console,
            console_writer: self.console_writer,
            writers: self.writers,
            hooks: self.hooks,
            marshal: self.marshal,
            time_format: self.time_format,
            caller_skip: self.caller_skip,
            duration_int: self.duration_int,
            error_handler: self.error_handler,
            exit_func: self.exit_func,
            clock: self.clock,
            bytes_pool: self.bytes_pool,
            records,
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("level", &self.level)
            .field("label", &self.label)
            .field("meta", &self.meta.keys())
            .field("writers", &self.writers.len())
            .finish_non_exhaustive()
    }
}
