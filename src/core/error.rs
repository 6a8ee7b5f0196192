//! Error types for the logging engine

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A sink accepted fewer bytes than it was handed
    #[error("short write: {written}/{expected} bytes accepted")]
    ShortWrite { written: usize, expected: usize },

    /// A fan-out destination failed
    #[error("writer #{index} failed: {source}")]
    MultiWriter {
        index: usize,
        #[source]
        source: Box<LoggerError>,
    },

    /// Write attempted on a closed writer
    #[error("writer already closed")]
    WriterClosed,

    /// Level string matched neither a name nor an integer
    #[error("unknown level string: '{0}'")]
    InvalidLevel(String),

    /// Integer level outside the representable range
    #[error("out-of-bounds level: '{0}'")]
    LevelOutOfRange(i64),

    /// Size string such as "100M" could not be parsed
    #[error("invalid size: '{0}'")]
    InvalidSize(String),

    /// Encoder name not present in the registry
    #[error("unknown encoder: '{0}'")]
    UnknownEncoder(String),

    /// A value could not be marshaled for output
    #[error("marshaling error: {0}")]
    Marshal(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a short write error
    pub fn short_write(written: usize, expected: usize) -> Self {
        LoggerError::ShortWrite { written, expected }
    }

    /// Wrap the error of the `index`-th destination of a multi writer
    pub fn multi_writer(index: usize, source: LoggerError) -> Self {
        LoggerError::MultiWriter {
            index,
            source: Box::new(source),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
