//! Output sinks
//!
//! A [`LevelWriter`] is a byte sink that may also look at the level of the
//! record being written. Plain `io::Write` sinks are adapted with
//! [`LevelWriterAdapter`] (for sinks writable through a shared reference,
//! such as `Stdout` or `File`) or [`SyncWriter`] (for everything else).

mod buffered;

pub use buffered::{BufferedWriter, DEFAULT_BUFFER_SIZE};

use crate::core::error::{LoggerError, Result};
use crate::core::level::Level;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

pub trait LevelWriter: Send + Sync {
    /// Writes the whole buffer, returning how many bytes were accepted.
    fn write(&self, buf: &[u8]) -> Result<usize>;

    /// Level-aware write; sinks that do not care about levels keep the default.
    fn write_level(&self, _level: Level, buf: &[u8]) -> Result<usize> {
        self.write(buf)
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: LevelWriter + ?Sized> LevelWriter for Arc<T> {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn write_level(&self, level: Level, buf: &[u8]) -> Result<usize> {
        (**self).write_level(level, buf)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

/// Adapts a sink that is writable through `&W` and ignores the level.
#[derive(Debug)]
pub struct LevelWriterAdapter<W> {
    inner: W,
}

impl<W> LevelWriterAdapter<W>
where
    W: Send + Sync,
    for<'a> &'a W: Write,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl LevelWriterAdapter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl LevelWriterAdapter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W> LevelWriter for LevelWriterAdapter<W>
where
    W: Send + Sync,
    for<'a> &'a W: Write,
{
    fn write(&self, buf: &[u8]) -> Result<usize> {
        (&self.inner).write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&self) -> Result<()> {
        (&self.inner).flush()?;
        Ok(())
    }
}

/// Serializes every write to `W` through a mutex.
pub struct SyncWriter<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> SyncWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: Write + Send> LevelWriter for SyncWriter<W> {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.inner.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&self) -> Result<()> {
        self.inner.lock().flush()?;
        Ok(())
    }
}

impl<W> fmt::Debug for SyncWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncWriter").finish_non_exhaustive()
    }
}

/// Fans every write out to several sinks, in order.
///
/// Stops at the first sink that fails or accepts fewer bytes than it was
/// given; the error carries that sink's index. Sinks before it have already
/// received the data.
#[derive(Clone, Default)]
pub struct MultiLevelWriter {
    writers: Vec<Arc<dyn LevelWriter>>,
}

impl MultiLevelWriter {
    pub fn new(writers: Vec<Arc<dyn LevelWriter>>) -> Self {
        Self { writers }
    }

    #[must_use]
    pub fn with_writer(mut self, writer: Arc<dyn LevelWriter>) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl LevelWriter for MultiLevelWriter {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        for (index, writer) in self.writers.iter().enumerate() {
            check_full_write(index, buf.len(), writer.write(buf))?;
        }
        Ok(buf.len())
    }

    fn write_level(&self, level: Level, buf: &[u8]) -> Result<usize> {
        for (index, writer) in self.writers.iter().enumerate() {
            check_full_write(index, buf.len(), writer.write_level(level, buf))?;
        }
        Ok(buf.len())
    }

    /// Flushes every sink, reporting the first failure.
    fn flush(&self) -> Result<()> {
        let mut first_err = None;
        for (index, writer) in self.writers.iter().enumerate() {
            if let Err(e) = writer.flush() {
                first_err.get_or_insert(LoggerError::multi_writer(index, e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

fn check_full_write(index: usize, expected: usize, result: Result<usize>) -> Result<()> {
    match result {
        Ok(n) if n == expected => Ok(()),
        Ok(n) => Err(LoggerError::multi_writer(
            index,
            LoggerError::short_write(n, expected),
        )),
        Err(e) => Err(LoggerError::multi_writer(index, e)),
    }
}

impl fmt::Debug for MultiLevelWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiLevelWriter")
            .field("writers", &self.writers.len())
            .finish()
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().clone()
    }

    /// Contents decoded lossily as UTF-8.
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buf.lock().clear();
    }
}

impl LevelWriter for MemoryWriter {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl LevelWriter for FailingWriter {
        fn write(&self, _buf: &[u8]) -> Result<usize> {
            Err(LoggerError::other("sink unavailable"))
        }
    }

    struct HalfWriter;

    impl LevelWriter for HalfWriter {
        fn write(&self, buf: &[u8]) -> Result<usize> {
            Ok(buf.len() / 2)
        }
    }

    struct LevelRecorder(Mutex<Vec<Level>>);

    impl LevelWriter for LevelRecorder {
        fn write(&self, buf: &[u8]) -> Result<usize> {
            Ok(buf.len())
        }

        fn write_level(&self, level: Level, buf: &[u8]) -> Result<usize> {
            self.0.lock().push(level);
            Ok(buf.len())
        }
    }

    #[test]
    fn test_memory_writer_shares_buffer() {
        let writer = MemoryWriter::new();
        let clone = writer.clone();
        LevelWriter::write(&clone, b"hello").unwrap();
        assert_eq!(writer.contents(), b"hello");
        writer.clear();
        assert!(clone.is_empty());
    }

    #[test]
    fn test_sync_writer() {
        let writer = SyncWriter::new(Vec::new());
        assert_eq!(writer.write_level(Level::INFO, b"abc").unwrap(), 3);
        writer.write(b"def").unwrap();
        assert_eq!(writer.into_inner(), b"abcdef");
    }

    #[test]
    fn test_adapter_over_file() {
        let file = tempfile::tempfile().unwrap();
        let writer = LevelWriterAdapter::new(file);
        writer.write(b"line\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.get_ref().metadata().unwrap().len(), 5);
    }

    #[test]
    fn test_multi_writer_fans_out() {
        let a = MemoryWriter::new();
        let b = MemoryWriter::new();
        let multi = MultiLevelWriter::new(vec![
            Arc::new(a.clone()) as Arc<dyn LevelWriter>,
            Arc::new(b.clone()),
        ]);
        assert_eq!(multi.write(b"data").unwrap(), 4);
        assert_eq!(a.contents(), b"data");
        assert_eq!(b.contents(), b"data");
    }

    #[test]
    fn test_multi_writer_stops_at_first_error() {
        let first = MemoryWriter::new();
        let last = MemoryWriter::new();
        let multi = MultiLevelWriter::new(vec![
            Arc::new(first.clone()) as Arc<dyn LevelWriter>,
            Arc::new(FailingWriter),
            Arc::new(last.clone()),
        ]);

        let err = multi.write(b"data").unwrap_err();
        assert!(matches!(err, LoggerError::MultiWriter { index: 1, .. }));
        assert_eq!(first.contents(), b"data");
        assert!(last.is_empty());
    }

    #[test]
    fn test_multi_writer_short_write() {
        let multi = MultiLevelWriter::default().with_writer(Arc::new(HalfWriter));
        let err = multi.write(b"data").unwrap_err();
        match err {
            LoggerError::MultiWriter { index, source } => {
                assert_eq!(index, 0);
                assert!(matches!(
                    *source,
                    LoggerError::ShortWrite {
                        written: 2,
                        expected: 4
                    }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_multi_writer_forwards_level() {
        let recorder = Arc::new(LevelRecorder(Mutex::new(Vec::new())));
        let multi = MultiLevelWriter::new(vec![recorder.clone() as Arc<dyn LevelWriter>]);
        multi.write_level(Level::WARN, b"x").unwrap();
        assert_eq!(*recorder.0.lock(), vec![Level::WARN]);
    }
}
