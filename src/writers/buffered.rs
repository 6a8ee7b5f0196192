//! Double-buffered writer with a background flush worker
//!
//! Writes land in the current buffer. When it fills up it is handed to the
//! flush worker and the spare buffer becomes current. The spare travels
//! through a one-slot permit channel: taking it waits for the previous
//! flush to finish, so at most one flush is ever in flight and buffers reach
//! the sink in the order they were filled.
//!
//! A sink that panics is reported like a failed write. The buffer always
//! comes back through the permit channel, so later writes never wait on a
//! buffer that is lost.

use super::LevelWriter;
use crate::core::error::{LoggerError, Result};
use crate::core::marshal::{default_error_handler, ErrorHandler};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Capacity of each buffer when none is given.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

struct WriteState {
    current: Vec<u8>,
    closed: bool,
    flush_tx: Option<Sender<Vec<u8>>>,
    worker: Option<JoinHandle<()>>,
}

pub struct BufferedWriter<W: Write + Send + 'static> {
    state: Mutex<WriteState>,
    permit_tx: Sender<Vec<u8>>,
    permit_rx: Receiver<Vec<u8>>,
    sink: Arc<Mutex<W>>,
    capacity: usize,
    error_handler: ErrorHandler,
}

impl<W: Write + Send + 'static> BufferedWriter<W> {
    pub fn new(sink: W, capacity: usize) -> Self {
        Self::with_error_handler(sink, capacity, default_error_handler())
    }

    /// `handler` receives failures of background flushes.
    pub fn with_error_handler(sink: W, capacity: usize, handler: ErrorHandler) -> Self {
        let capacity = capacity.max(1);
        let sink = Arc::new(Mutex::new(sink));
        let (permit_tx, permit_rx) = bounded(1);
        // bounded(1) is empty, so this cannot fail
        let _ = permit_tx.send(Vec::with_capacity(capacity));
        let (flush_tx, flush_rx) = unbounded::<Vec<u8>>();

        let worker = {
            let sink = Arc::clone(&sink);
            let permit_tx = permit_tx.clone();
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                for mut buf in flush_rx {
                    if let Err(e) = write_through(&sink, &buf) {
                        let _ = panic::catch_unwind(AssertUnwindSafe(|| handler(&e)));
                    }
                    buf.clear();
                    if permit_tx.send(buf).is_err() {
                        break;
                    }
                }
            })
        };

        Self {
            state: Mutex::new(WriteState {
                current: Vec::with_capacity(capacity),
                closed: false,
                flush_tx: Some(flush_tx),
                worker: Some(worker),
            }),
            permit_tx,
            permit_rx,
            sink,
            capacity,
            error_handler: handler,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Flushes what is buffered, waits for the worker and rejects further
    /// writes. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        let flushed = self.flush_current(&mut state);
        state.closed = true;
        state.flush_tx = None;
        if let Some(worker) = state.worker.take() {
            if worker.join().is_err() {
                return Err(LoggerError::other("buffered writer flush worker panicked"));
            }
        }
        flushed
    }

    /// Hands the full buffer to the worker and makes the spare current.
    fn swap_and_flush(&self, state: &mut WriteState) -> Result<()> {
        let spare = self
            .permit_rx
            .recv()
            .map_err(|_| LoggerError::WriterClosed)?;
        let full = std::mem::replace(&mut state.current, spare);
        let Some(flush_tx) = state.flush_tx.as_ref() else {
            return Err(LoggerError::WriterClosed);
        };
        if let Err(rejected) = flush_tx.send(full) {
            // worker is gone; write in place and recover the buffer
            let mut buf = rejected.into_inner();
            let result = write_through(&self.sink, &buf);
            buf.clear();
            let _ = self.permit_tx.send(buf);
            return result;
        }
        Ok(())
    }

    /// Synchronously writes the current buffer once no flush is in flight.
    fn flush_current(&self, state: &mut WriteState) -> Result<()> {
        let spare = self
            .permit_rx
            .recv()
            .map_err(|_| LoggerError::WriterClosed)?;
        let result = if state.current.is_empty() {
            flush_sink(&self.sink)
        } else {
            write_through(&self.sink, &state.current)
        };
        state.current.clear();
        let _ = self.permit_tx.send(spare);
        result
    }
}

fn write_through<W: Write>(sink: &Mutex<W>, buf: &[u8]) -> Result<()> {
    guard_sink(|| {
        let mut sink = sink.lock();
        sink.write_all(buf)
            .and_then(|()| sink.flush())
            .map_err(|e| LoggerError::io_operation("flushing buffer", "sink rejected bytes", e))
    })
}

fn flush_sink<W: Write>(sink: &Mutex<W>) -> Result<()> {
    guard_sink(|| {
        sink.lock()
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing buffer", "sink flush failed", e))
    })
}

/// Runs a sink operation, turning a panic into an error. `parking_lot`
/// locks are not poisoned, so the sink stays usable afterwards.
fn guard_sink(op: impl FnOnce() -> Result<()>) -> Result<()> {
    panic::catch_unwind(AssertUnwindSafe(op))
        .unwrap_or_else(|_| Err(LoggerError::other("sink panicked while flushing buffer")))
}

impl<W: Write + Send + 'static> LevelWriter for BufferedWriter<W> {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LoggerError::WriterClosed);
        }

        let mut rest = buf;
        while !rest.is_empty() {
            let room = self.capacity - state.current.len();
            let (now, later) = rest.split_at(room.min(rest.len()));
            state.current.extend_from_slice(now);
            rest = later;
            if state.current.len() >= self.capacity {
                self.swap_and_flush(&mut state)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        self.flush_current(&mut state)
    }
}

impl<W: Write + Send + 'static> Drop for BufferedWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            (self.error_handler)(&e);
        }
    }
}

impl<W: Write + Send + 'static> fmt::Debug for BufferedWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedWriter")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
