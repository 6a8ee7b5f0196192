//! Logger metrics for observability
//!
//! Counters for pool behavior and output health: how many records had to be
//! allocated, how many were emitted or struck, and how many sink writes
//! failed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use chromalog::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_emitted();
/// metrics.record_struck();
///
/// assert_eq!(metrics.records_emitted(), 1);
/// assert_eq!(metrics.records_struck(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records built because the pool had none idle
    records_allocated: AtomicU64,

    /// Records that reached their writers
    records_emitted: AtomicU64,

    /// Records finalized below the logger level or discarded
    records_struck: AtomicU64,

    /// Failed writes reported to the error handler
    write_errors: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_allocated: AtomicU64::new(0),
            records_emitted: AtomicU64::new(0),
            records_struck: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_allocated(&self) -> u64 {
        self.records_allocated.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_emitted(&self) -> u64 {
        self.records_emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_struck(&self) -> u64 {
        self.records_struck.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    /// Record a pool miss; returns the previous count
    #[inline]
    pub fn record_allocated(&self) -> u64 {
        self.records_allocated.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_emitted(&self) -> u64 {
        self.records_emitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_struck(&self) -> u64 {
        self.records_struck.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_error(&self) -> u64 {
        self.write_errors.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of finalized records that were struck, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been finalized.
    pub fn struck_rate(&self) -> f64 {
        let struck = self.records_struck() as f64;
        let total = self.records_emitted() as f64 + struck;
        if total == 0.0 {
            0.0
        } else {
            (struck / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_allocated.store(0, Ordering::Relaxed);
        self.records_emitted.store(0, Ordering::Relaxed);
        self.records_struck.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            records_allocated: AtomicU64::new(self.records_allocated()),
            records_emitted: AtomicU64::new(self.records_emitted()),
            records_struck: AtomicU64::new(self.records_struck()),
            write_errors: AtomicU64::new(self.write_errors()),
        }
    }
}
