//! Bounded character queue shared between the text producer and the scheduler.
//!
//! `RingQueue` is the plain ring. `SharedQueue` wraps it in a
//! `parking_lot::Mutex` so every operation runs as one short critical section
//! and no caller ever holds a reference into the slot array.

pub mod ring;

use std::sync::Arc;

use parking_lot::Mutex;

pub use ring::RingQueue;

/// Queue capacity: roughly 130 words of buffered speech at 5 chars/word.
pub const CHAR_QUEUE_CAPACITY: usize = 650;

/// Cloneable, thread-safe handle to a [`RingQueue`].
///
/// Clones share the same ring. Each method takes the lock exactly once, so
/// `len`/`is_empty`/`is_full` are consistent point-in-time reads.
pub struct SharedQueue<T> {
    inner: Arc<Mutex<RingQueue<T>>>,
}

impl<T> Clone for SharedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingQueue::new(capacity))),
        }
    }

    pub fn push(&self, value: T) -> Option<T> {
        self.inner.lock().push(value)
    }

    /// Push every element under a single lock. Returns the overwrite count.
    pub fn push_batch<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        self.inner.lock().push_batch(values)
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().is_full()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

impl<T: Clone> SharedQueue<T> {
    pub fn peek(&self) -> Option<T> {
        self.inner.lock().peek().cloned()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.lock().get(index).cloned()
    }

    /// Snapshot of the queued elements, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.lock().to_vec()
    }
}

impl<T> std::fmt::Debug for SharedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.inner.lock();
        f.debug_struct("SharedQueue")
            .field("len", &ring.len())
            .field("capacity", &ring.capacity())
            .finish_non_exhaustive()
    }
}

/// Character queue sized for the default playback buffer.
pub fn create_char_queue() -> SharedQueue<char> {
    SharedQueue::new(CHAR_QUEUE_CAPACITY)
}
