// ============================================================================
// Bounded Blocking Queue
// ============================================================================

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Multi-producer multi-consumer FIFO queue with a fixed capacity.
///
/// Producers block while the queue is full and are woken as soon as a
/// consumer frees a slot. A push that cannot complete hands the item back
/// to the caller; items are never dropped silently.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bounded queue capacity must be positive");
        let (tx, rx) = channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until there is room for `item`
    pub fn push(&self, item: T) {
        if self.tx.send(item).is_err() {
            unreachable!("bounded queue lost its receiver");
        }
    }

    /// Wait at most `timeout` for room; on timeout the item is returned
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        match self.tx.send_timeout(item, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(item)) | Err(SendTimeoutError::Disconnected(item)) => {
                Err(item)
            },
        }
    }

    pub fn try_push(&self, item: T) -> Result<(), T> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => Err(item),
        }
    }

    /// Block until an item is available
    pub fn pop(&self) -> T {
        match self.rx.recv() {
            Ok(item) => item,
            Err(_) => unreachable!("bounded queue lost its sender"),
        }
    }

    /// Wait at most `timeout` for an item
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Pop the items queued when the call starts, without blocking.
    ///
    /// Items pushed while draining, including by `f` itself, stay queued for
    /// the next call. Returns the number of items handed to `f`.
    pub fn drain(&self, mut f: impl FnMut(T)) -> usize {
        let mut count = 0;
        for item in self.rx.try_iter().take(self.rx.len()) {
            f(item);
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rx.is_full()
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_timeout_returns_item_when_full() {
        let queue = BoundedQueue::new(2);
        assert!(queue.try_push(1).is_ok());
        assert!(queue.push_timeout(2, Duration::from_millis(5)).is_ok());
        assert!(queue.is_full());

        assert_eq!(queue.push_timeout(3, Duration::from_millis(20)), Err(3));
        assert_eq!(queue.try_push(4), Err(4));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pop_frees_slot() {
        let queue = BoundedQueue::new(1);
        queue.push("a");

        assert_eq!(queue.pop(), "a");
        assert!(queue.push_timeout("b", Duration::from_millis(5)).is_ok());
        assert_eq!(queue.pop_timeout(Duration::from_millis(5)), Some("b"));
        assert_eq!(queue.pop_timeout(Duration::from_millis(5)), None);
    }

    #[test]
    fn test_drain_in_fifo_order() {
        let queue = BoundedQueue::new(4);
        for i in 0..4 {
            queue.push(i);
        }

        let mut seen = Vec::new();
        assert_eq!(queue.drain(|item| seen.push(item)), 4);
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_leaves_requeued_items() {
        let queue = BoundedQueue::new(4);
        queue.push(0);
        queue.push(1);

        let drained = queue.drain(|item| {
            assert!(queue.try_push(item + 10).is_ok());
        });

        assert_eq!(drained, 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(10));
        assert_eq!(queue.try_pop(), Some(11));
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_rejected() {
        let _queue: BoundedQueue<u8> = BoundedQueue::new(0);
    }
}
