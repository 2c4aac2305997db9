// ============================================================================
// Unbounded Blocking Queue
// ============================================================================

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Multi-producer multi-consumer FIFO queue with no capacity limit.
///
/// `push` never blocks. `pop` blocks until an item is available and
/// `pop_timeout` gives up once the timeout elapses. Clones share the same
/// underlying queue.
#[derive(Debug)]
pub struct UnboundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> UnboundedQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, item: T) {
        // Sending only fails once every receiver is gone; this queue owns one.
        if self.tx.send(item).is_err() {
            unreachable!("unbounded queue lost its receiver");
        }
    }

    /// Block until an item is available
    pub fn pop(&self) -> T {
        match self.rx.recv() {
            Ok(item) => item,
            Err(_) => unreachable!("unbounded queue lost its sender"),
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
}

impl<T> Clone for UnboundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for UnboundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let queue = UnboundedQueue::new();
        for i in 0..5 {
            queue.push(i);
        }

        let popped: Vec<i32> = (0..5).map(|_| queue.pop()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_timeout_on_empty_queue() {
        let queue: UnboundedQueue<u32> = UnboundedQueue::new();
        let started = Instant::now();

        assert_eq!(queue.pop_timeout(Duration::from_millis(20)), None);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_blocking_pop_wakes_on_push() {
        let queue = UnboundedQueue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push("fill");
        });

        assert_eq!(queue.pop(), "fill");
        handle.join().unwrap();
    }

    #[test]
    fn test_drain() {
        let queue = UnboundedQueue::new();
        queue.push(1);
        queue.push(2);

        let mut seen = Vec::new();
        assert_eq!(queue.drain(|item| seen.push(item)), 2);
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(queue.drain(|_| {}), 0);
    }

    #[test]
    fn test_drain_terminates_when_requeueing() {
        let queue = UnboundedQueue::new();
        queue.push(1);
        queue.push(2);

        // Every drained item goes straight back in
        assert_eq!(queue.drain(|item| queue.push(item)), 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(|_| {}), 2);
        assert!(queue.is_empty());
    }
}
