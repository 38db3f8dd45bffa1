//! Bounded line buffer between the reader tasks and the response collector
//!
//! Producers never block: when the ring is full the oldest line is evicted.
//! A single consumer awaits new lines through a [`Notify`].

use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

/// Default number of lines buffered between reads
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Many-producer, single-consumer line ring with drop-oldest overflow
#[derive(Debug)]
pub struct LineQueue {
    lines: ArrayQueue<String>,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl LineQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: ArrayQueue::new(capacity.max(1)),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Append a line, evicting the oldest one if the ring is full
    pub fn push(&self, line: String) {
        if self.lines.force_push(line).is_some() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            trace!("Line queue full, dropped oldest line (total dropped: {})", total);
        }
        self.notify.notify_one();
    }

    pub fn try_pop(&self) -> Option<String> {
        self.lines.pop()
    }

    /// Wait for the next line.
    ///
    /// Returns `None` once the queue is closed and drained. Cancel-safe: a
    /// line is only removed when this future completes.
    pub async fn pop(&self) -> Option<String> {
        loop {
            if let Some(line) = self.lines.pop() {
                return Some(line);
            }
            if self.is_closed() {
                return self.lines.pop();
            }
            self.notify.notified().await;
        }
    }

    /// Discard everything buffered, returning how many lines were dropped
    pub fn flush(&self) -> usize {
        let mut count = 0;
        while self.lines.pop().is_some() {
            count += 1;
        }
        count
    }

    /// Mark that no more lines will arrive and wake the consumer
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lines.capacity()
    }

    /// Lines evicted by overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for LineQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
