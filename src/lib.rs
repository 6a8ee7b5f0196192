//! # chromalog
//!
//! A structured logging engine built around pooled, fluent records.
//!
//! ## Features
//!
//! - **Fan-out**: one record is rendered independently for every
//!   encoder/writer pair, e.g. JSON to a file and text to a socket
//! - **Cheap when filtered**: records below the logger level skip all
//!   rendering; record state and byte buffers are pooled
//! - **Console rainbow**: optional colored console output driven by a
//!   per-logger meta key registry
//! - **Double-buffered writer**: a [`BufferedWriter`] flushes full buffers on a
//!   background thread while the next one fills
//!
//! ## Example
//!
//! ```
//! use chromalog::prelude::*;
//! use std::sync::Arc;
//!
//! let out = MemoryWriter::new();
//! let logger = LoggerBuilder::new()
//!     .with_defaults()
//!     .meta_keys(["META_LEVEL", "META_LABEL", "message"])
//!     .label("api")
//!     .encoder_writer_pair(Arc::new(TextEncoder::new()), Arc::new(out.clone()))
//!     .build();
//!
//! logger.info().str("method", "GET").u16("status", 200).msg("served").done();
//! assert_eq!(out.contents_string(), "INFO api > method=GET status=200 served\n");
//! ```

pub mod core;
pub mod encoder;
pub mod macros;
pub mod writers;

pub mod prelude {
    pub use crate::core::{
        Hook, HookFn, Level, LevelHook, Logger, LoggerBuilder, LoggerConfig, LoggerError,
        LoggerMetrics, Record, Result, SgrCode, TimeFormat,
    };
    pub use crate::encoder::{Encoder, JsonEncoder, TextEncoder};
    pub use crate::writers::{
        BufferedWriter, LevelWriter, LevelWriterAdapter, MemoryWriter, MultiLevelWriter,
        SyncWriter,
    };
}

pub use crate::core::{
    parse_size, BytesPool, Caller, ErrorStack, FieldNames, Hook, HookFn, Level, LevelHook, Logger,
    LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, MarshalFuncs, MetaKeys,
    OutputConfig, Pool, Record, Result, SgrCode, TimeFormat, WriterEncoderPair,
};
pub use crate::encoder::{encoder_by_name, Encoder, JsonEncoder, TextEncoder};
pub use crate::writers::{
    BufferedWriter, LevelWriter, LevelWriterAdapter, MemoryWriter, MultiLevelWriter, SyncWriter,
    DEFAULT_BUFFER_SIZE,
};
