//! Logging macros for message-only records.
//!
//! Each macro builds a record at the given level, formats the message into
//! the record's reusable buffer and finalizes it. The caller field points at
//! the macro invocation.
//!
//! # Examples
//!
//! ```
//! use chromalog::prelude::*;
//! use chromalog::info;
//! use std::sync::Arc;
//!
//! let out = MemoryWriter::new();
//! let logger = LoggerBuilder::new()
//!     .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
//!     .build();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! assert_eq!(out.contents_string(), "{\"message\":\"Server listening on port 8080\"}\n");
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use chromalog::prelude::*;
/// # let logger = LoggerBuilder::new().build();
/// use chromalog::log;
/// log!(logger, Level::INFO, "Simple message");
/// log!(logger, Level::ERROR, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.level($level).msgf(format_args!($($arg)+)).done()
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::TRACE, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use chromalog::prelude::*;
/// # let logger = LoggerBuilder::new().build();
/// use chromalog::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::INFO, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARN, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ERROR, $($arg)+)
    };
}

/// Log a fatal-level message. Finalizing it calls the logger's exit
/// function.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::FATAL, $($arg)+)
    };
}
