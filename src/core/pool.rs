//! Object pools for records and byte buffers
//!
//! `put` moves the object into the pool, so a previous owner cannot keep
//! using it. `get` always hands out an object that has been through the
//! pool's recycle step (or a freshly built one).

use parking_lot::Mutex;
use std::fmt;

/// Initial capacity of buffers created by [`BytesPool::default`].
pub const DEFAULT_MIN_BYTES_CAP: usize = 128;
/// Buffers that grew beyond this capacity are dropped instead of pooled.
pub const DEFAULT_MAX_BYTES_CAP: usize = 64 * 1024;
/// Upper bound on idle objects kept by a pool.
pub const DEFAULT_MAX_IDLE: usize = 1024;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Recycle<T> = Box<dyn Fn(&mut T) -> bool + Send + Sync>;

/// A LIFO pool of reusable objects.
///
/// `recycle` resets an object on its way back in and decides whether it is
/// worth keeping.
pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
    factory: Factory<T>,
    recycle: Recycle<T>,
    max_idle: usize,
}

impl<T> Pool<T> {
    pub fn new<F, R>(factory: F, recycle: R) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        R: Fn(&mut T) -> bool + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            recycle: Box::new(recycle),
            max_idle: DEFAULT_MAX_IDLE,
        }
    }

    #[must_use]
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Take an idle object, or build one when the pool is empty.
    pub fn get(&self) -> T {
        if let Some(item) = self.idle.lock().pop() {
            return item;
        }
        (self.factory)()
    }

    /// Take an idle object, reporting whether it had to be built.
    pub fn get_or_create(&self) -> (T, bool) {
        match self.idle.lock().pop() {
            Some(item) => (item, false),
            None => ((self.factory)(), true),
        }
    }

    /// Return an object to the pool.
    pub fn put(&self, mut item: T) {
        if !(self.recycle)(&mut item) {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    /// Number of objects currently waiting in the pool.
    pub fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.idle_len())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Pool of byte buffers bounded by a maximum retained capacity.
pub struct BytesPool {
    inner: Pool<Vec<u8>>,
    min_cap: usize,
    max_cap: usize,
}

impl BytesPool {
    pub fn new(min_cap: usize, max_cap: usize) -> Self {
        let max_cap = max_cap.max(min_cap);
        Self {
            inner: Pool::new(
                move || Vec::with_capacity(min_cap),
                move |buf: &mut Vec<u8>| {
                    buf.clear();
                    buf.capacity() <= max_cap
                },
            ),
            min_cap,
            max_cap,
        }
    }

    /// An empty buffer with at least `min_cap` capacity.
    #[inline]
    pub fn get(&self) -> Vec<u8> {
        self.inner.get()
    }

    /// Return a buffer. Buffers larger than `max_cap` are dropped.
    #[inline]
    pub fn put(&self, buf: Vec<u8>) {
        self.inner.put(buf);
    }

    pub fn min_cap(&self) -> usize {
        self.min_cap
    }

    pub fn max_cap(&self) -> usize {
        self.max_cap
    }

    pub fn idle_len(&self) -> usize {
        self.inner.idle_len()
    }
}

impl Default for BytesPool {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BYTES_CAP, DEFAULT_MAX_BYTES_CAP)
    }
}

impl fmt::Debug for BytesPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytesPool")
            .field("min_cap", &self.min_cap)
            .field("max_cap", &self.max_cap)
            .field("idle", &self.idle_len())
            .finish()
    }
}
