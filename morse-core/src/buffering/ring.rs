//! Fixed-capacity character ring with overwrite-on-full semantics.
//!
//! Occupied slots always form one contiguous run (mod capacity) of `len`
//! cells starting at `read`. `write` is the slot the next push lands in.

/// A bounded FIFO that never rejects a write.
///
/// When full, `push` overwrites the oldest element and advances the read
/// cursor past it. Not synchronised; wrap in [`super::SharedQueue`] to share
/// between a producer and a consumer.
#[derive(Debug, Clone)]
pub struct RingQueue<T> {
    slots: Box<[Option<T>]>,
    read: usize,
    write: usize,
    len: usize,
}

impl<T> RingQueue<T> {
    /// Create an empty ring. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            read: 0,
            write: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Slot index of the oldest element (or where it will be).
    pub fn read_index(&self) -> usize {
        self.read
    }

    /// Slot index the next push writes to.
    pub fn write_index(&self) -> usize {
        self.write
    }

    /// Insert `value`, returning whatever previously occupied the slot.
    ///
    /// The slot is only ever occupied when the ring is full, so a `Some`
    /// return means the oldest unread element was dropped.
    pub fn push(&mut self, value: T) -> Option<T> {
        let overwritten = self.slots[self.write].replace(value);

        if self.is_full() {
            self.read = self.advance(self.read);
        } else {
            self.len += 1;
        }

        self.write = self.advance(self.write);
        overwritten
    }

    /// Remove and return the oldest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let value = self.slots[self.read].take();
        self.read = self.advance(self.read);
        self.len -= 1;
        value
    }

    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.read].as_ref()
    }

    /// Empty every slot and rewind both cursors to zero.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.read = 0;
        self.write = 0;
        self.len = 0;
    }

    /// Push each element in order; identical to calling `push` in a loop.
    ///
    /// Returns how many unread elements were overwritten.
    pub fn push_batch<I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        values
            .into_iter()
            .filter_map(|value| self.push(value))
            .count()
    }

    /// The `index`-th element counting from the oldest, without removing it.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[(self.read + index) % self.capacity()].as_ref()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            next: 0,
        }
    }

    #[inline]
    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.capacity()
    }
}

impl<T: Clone> RingQueue<T> {
    /// Non-destructive snapshot, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

/// Oldest-first iterator over a [`RingQueue`].
pub struct Iter<'a, T> {
    ring: &'a RingQueue<T>,
    next: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.ring.get(self.next)?;
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ring.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<'a, T> IntoIterator for &'a RingQueue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
