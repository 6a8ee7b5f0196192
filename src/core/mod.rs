//! Core logger types and traits

pub mod caller;
pub mod config;
pub mod error;
pub mod hook;
pub mod level;
pub mod logger;
pub mod marshal;
pub mod meta;
pub mod metrics;
mod packer;
pub mod pool;
pub mod record;
pub mod time_format;

pub use caller::Caller;
pub use config::{parse_size, LoggerConfig, OutputConfig};
pub use error::{LoggerError, Result};
pub use hook::{Hook, HookFn, LevelHook};
pub use level::Level;
pub use logger::{Logger, LoggerBuilder, WriterEncoderPair};
pub use marshal::{
    source_chain_stack, upper_level_name, ClockFn, ErrorHandler, ErrorStack, ExitFunc,
    MarshalFuncs,
};
pub use meta::{FieldNames, MetaKeys, SgrCode, FIELD_KEY_COLOR_KEY, META_END_COLOR_KEY};
pub use metrics::LoggerMetrics;
pub use pool::{BytesPool, Pool};
pub use record::Record;
pub use time_format::TimeFormat;
