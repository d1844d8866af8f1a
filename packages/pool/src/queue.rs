//! Blocking FIFO queue with close-then-drain shutdown.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded multi-producer, multi-consumer job queue.
///
/// Consumers block in [`pop`](Self::pop) while the queue is empty. After
/// [`close`](Self::close), consumers keep receiving the items already queued
/// and get `None` once it is empty.
#[derive(Debug)]
pub struct JobQueue<T> {
    state: Mutex<QueueState<T>>,
    ready: Condvar,
}

impl<T> JobQueue<T> {
    /// Create an open, empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append an item and wake one consumer.
    ///
    /// # Errors
    ///
    /// * Returns the item back if the queue has been closed
    pub fn push(&self, item: T) -> Result<(), T> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(item);
            }
            state.items.push_back(item);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Take the oldest item, blocking while the queue is open and empty.
    ///
    /// Returns `None` only when the queue is closed and fully drained.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Stop accepting items and wake every consumer.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        for i in 0..5 {
            queue.push(i).unwrap();
        }
        queue.close();

        let drained: Vec<i32> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_push_after_close_is_rejected() {
        let queue = JobQueue::new();
        queue.close();

        assert_eq!(queue.push(7), Err(7));
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_close_drains_queued_items() {
        let queue = JobQueue::new();
        queue.push("a").unwrap();
        queue.push("b").unwrap();
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), Some("b"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_blocked_consumer_wakes_on_push() {
        let queue = Arc::new(JobQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.push(42).unwrap();

        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn test_blocked_consumers_wake_on_close() {
        let queue: Arc<JobQueue<u8>> = Arc::new(JobQueue::new());
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.close();

        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }
}
