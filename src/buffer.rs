//! Bounded FIFO buffer shared between producers and consumers.
//!
//! Two counting semaphores track free and filled slots and a mutex guards
//! the queue itself. Waiting for a slot never happens while the queue mutex
//! is held, so producers and consumers cannot deadlock on it.
//!
//! ```text
//!   put:  empty_slots.acquire -> lock queue, push_back -> full_slots.release
//!   take: full_slots.acquire  -> lock queue, pop_front -> empty_slots.release
//! ```
//!
//! [`put_with`](BoundedBuffer::put_with) and
//! [`take_with`](BoundedBuffer::take_with) run an observer while the queue
//! lock is still held, so notifications about an item are ordered the same
//! way as the operations on it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::trace;

use crate::sync::{lock, BufferError, Cancelled, Semaphore};

/// Default capacity used by the producer/consumer simulation.
pub const DEFAULT_CAPACITY: usize = 3;

struct Queue {
    items: VecDeque<i32>,
    /// Largest length ever observed.
    high_water: usize,
}

/// Fixed-capacity, thread-safe FIFO of integers with blocking put/take.
pub struct BoundedBuffer {
    capacity: usize,
    queue: Mutex<Queue>,
    empty_slots: Semaphore,
    full_slots: Semaphore,
}

impl BoundedBuffer {
    /// Create an empty buffer.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be positive");
        BoundedBuffer {
            capacity,
            queue: Mutex::new(Queue {
                items: VecDeque::with_capacity(capacity),
                high_water: 0,
            }),
            empty_slots: Semaphore::new(capacity),
            full_slots: Semaphore::new(0),
        }
    }

    /// Append `item`, blocking while the buffer is full.
    pub fn put(&self, item: i32) -> Result<(), Cancelled> {
        self.put_with(item, |_| ())
    }

    /// Remove the oldest item, blocking while the buffer is empty.
    pub fn take(&self) -> Result<i32, Cancelled> {
        self.take_with(|_| ())
    }

    /// Like [`put`](Self::put), calling `on_put` under the queue lock before
    /// the item becomes visible to takers.
    pub fn put_with(&self, item: i32, on_put: impl FnOnce(i32)) -> Result<(), Cancelled> {
        self.empty_slots.acquire()?;
        self.push(item, on_put);
        Ok(())
    }

    /// Like [`take`](Self::take), calling `on_take` under the queue lock
    /// before the slot is handed back to producers.
    pub fn take_with(&self, on_take: impl FnOnce(i32)) -> Result<i32, Cancelled> {
        self.full_slots.acquire()?;
        Ok(self.pop(on_take))
    }

    /// Like [`put`](Self::put) but gives up after `timeout`.
    pub fn put_timeout(&self, item: i32, timeout: Duration) -> Result<(), BufferError> {
        self.empty_slots.acquire_timeout(timeout)?;
        self.push(item, |_| ());
        Ok(())
    }

    /// Like [`take`](Self::take) but gives up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<i32, BufferError> {
        self.full_slots.acquire_timeout(timeout)?;
        Ok(self.pop(|_| ()))
    }

    /// Append `item` if a slot is free. Returns `Ok(false)` when full.
    pub fn try_put(&self, item: i32) -> Result<bool, Cancelled> {
        if !self.empty_slots.try_acquire()? {
            return Ok(false);
        }
        self.push(item, |_| ());
        Ok(true)
    }

    /// Remove the oldest item if there is one.
    pub fn try_take(&self) -> Result<Option<i32>, Cancelled> {
        if !self.full_slots.try_acquire()? {
            return Ok(None);
        }
        Ok(Some(self.pop(|_| ())))
    }

    /// Wake every blocked caller with `Cancelled` and refuse further waits.
    ///
    /// Items already in the queue stay there and remain visible through
    /// [`snapshot`](Self::snapshot).
    pub fn shutdown(&self) {
        self.empty_slots.close();
        self.full_slots.close();
    }

    /// No producer will put again: a `take` that would block now fails
    /// with `Cancelled`. Items already queued can still be taken.
    pub fn producers_finished(&self) {
        self.full_slots.stop_waiting();
    }

    /// No consumer will take again: a `put` that would block now fails
    /// with `Cancelled`. Puts into free slots still succeed.
    pub fn consumers_finished(&self) {
        self.empty_slots.stop_waiting();
    }

    #[cfg(test)]
    fn is_shut_down(&self) -> bool {
        self.empty_slots.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest number of items the buffer has held at once.
    pub fn high_water(&self) -> usize {
        lock(&self.queue).high_water
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> Vec<i32> {
        lock(&self.queue).items.iter().copied().collect()
    }

    // Caller holds an empty-slot permit.
    fn push(&self, item: i32, on_put: impl FnOnce(i32)) {
        {
            let mut q = lock(&self.queue);
            q.items.push_back(item);
            q.high_water = q.high_water.max(q.items.len());
            debug_assert!(q.items.len() <= self.capacity);
            trace!(item, len = q.items.len(), "buffer put");
            on_put(item);
        }
        self.full_slots.release();
    }

    // Caller holds a filled-slot permit.
    fn pop(&self, on_take: impl FnOnce(i32)) -> i32 {
        let item = {
            let mut q = lock(&self.queue);
            let Some(item) = q.items.pop_front() else {
                unreachable!("filled-slot permit held but queue is empty");
            };
            trace!(item, len = q.items.len(), "buffer take");
            on_take(item);
            item
        };
        self.empty_slots.release();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let buf = BoundedBuffer::new(2);
        buf.put(10).unwrap();
        buf.put(20).unwrap();
        assert_eq!(buf.take(), Ok(10));
        assert_eq!(buf.take(), Ok(20));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_observers_run_before_item_is_visible() {
        let buf = BoundedBuffer::new(1);
        let mut seen = Vec::new();
        buf.put_with(4, |item| {
            // The push is done but no taker can claim it yet.
            assert_eq!(buf.try_take(), Ok(None));
            seen.push(item);
        })
        .unwrap();
        let item = buf
            .take_with(|item| {
                assert_eq!(buf.try_put(9), Ok(false));
                seen.push(item);
            })
            .unwrap();
        assert_eq!(item, 4);
        assert_eq!(seen, vec![4, 4]);
        assert_eq!(buf.try_put(9), Ok(true));
    }

    #[test]
    fn test_try_put_respects_capacity() {
        let buf = BoundedBuffer::new(1);
        assert_eq!(buf.try_put(1), Ok(true));
        assert_eq!(buf.try_put(2), Ok(false));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.try_take(), Ok(Some(1)));
        assert_eq!(buf.try_take(), Ok(None));
        assert_eq!(buf.high_water(), 1);
    }

    #[test]
    fn test_timeouts() {
        let buf = BoundedBuffer::new(1);
        assert_eq!(
            buf.take_timeout(Duration::from_millis(5)),
            Err(BufferError::Timeout)
        );
        buf.put(7).unwrap();
        assert_eq!(
            buf.put_timeout(8, Duration::from_millis(5)),
            Err(BufferError::Timeout)
        );
        assert_eq!(buf.snapshot(), vec![7]);
    }

    #[test]
    fn test_shutdown_keeps_contents() {
        let buf = BoundedBuffer::new(2);
        buf.put(1).unwrap();
        buf.shutdown();
        assert!(buf.is_shut_down());
        assert_eq!(buf.put(2), Err(Cancelled));
        assert_eq!(buf.take(), Err(Cancelled));
        assert_eq!(buf.snapshot(), vec![1]);
    }

    #[test]
    fn test_consumers_finished_strands_only_blocking_puts() {
        let buf = BoundedBuffer::new(2);
        buf.consumers_finished();
        assert_eq!(buf.put(1), Ok(()));
        assert_eq!(buf.put(2), Ok(()));
        assert_eq!(buf.put(3), Err(Cancelled));
        assert_eq!(buf.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_producers_finished_lets_queued_items_drain() {
        let buf = BoundedBuffer::new(2);
        buf.put(5).unwrap();
        buf.producers_finished();
        assert_eq!(buf.take(), Ok(5));
        assert_eq!(buf.take(), Err(Cancelled));
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_rejected() {
        let _ = BoundedBuffer::new(0);
    }
}
