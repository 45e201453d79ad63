//! Process-wide FIFO used at both ends of the pipeline: bounded with
//! backpressure for input and pool backlogs, unbounded for output.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::error::QueueError;

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Thread-safe FIFO with blocking-with-timeout dequeue, single and batch
/// enqueue, and an optional capacity bound. All synchronization is internal;
/// callers never lock.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: Option<usize>,
    items_avail: Notify,
    space_avail: Notify,
}

impl<T> WorkQueue<T> {
    /// Bounded queue: enqueue beyond `capacity` blocks or fails.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    /// Unbounded queue: enqueue never blocks.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            capacity,
            items_avail: Notify::new(),
            space_avail: Notify::new(),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Non-waiting enqueue: `Full` at capacity, `Closed` after close.
    pub fn try_enqueue(&self, item: T) -> Result<(), QueueError> {
        let mut g = self.inner.lock().unwrap();
        if g.closed {
            return Err(QueueError::Closed);
        }
        if self.at_capacity(&g, 1) {
            return Err(QueueError::Full);
        }
        g.items.push_back(item);
        drop(g);
        self.items_avail.notify_one();
        Ok(())
    }

    /// Waits for space without bound. Fails only if the queue closes.
    pub async fn enqueue(&self, item: T) -> Result<(), QueueError> {
        loop {
            {
                let mut g = self.inner.lock().unwrap();
                if g.closed {
                    return Err(QueueError::Closed);
                }
                if !self.at_capacity(&g, 1) {
                    g.items.push_back(item);
                    drop(g);
                    self.items_avail.notify_one();
                    return Ok(());
                }
            }
            self.space_avail.notified().await;
        }
    }

    /// Waits up to `wait` for space; `Full` once the budget is spent.
    pub async fn enqueue_timeout(&self, item: T, wait: Duration) -> Result<(), QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            {
                let mut g = self.inner.lock().unwrap();
                if g.closed {
                    return Err(QueueError::Closed);
                }
                if !self.at_capacity(&g, 1) {
                    g.items.push_back(item);
                    drop(g);
                    self.items_avail.notify_one();
                    return Ok(());
                }
            }
            if timeout_at(deadline, self.space_avail.notified())
                .await
                .is_err()
            {
                return Err(QueueError::Full);
            }
        }
    }

    /// Single admission attempt for a whole batch, all-or-nothing: either
    /// every item is enqueued atomically within the wait budget, or nothing
    /// is. A batch larger than the capacity can never fit and fails fast.
    pub async fn enqueue_batch(&self, items: Vec<T>, wait: Duration) -> Result<(), QueueError> {
        if items.is_empty() {
            return Ok(());
        }
        if let Some(cap) = self.capacity {
            if items.len() > cap {
                return Err(QueueError::Full);
            }
        }
        let deadline = Instant::now() + wait;
        let mut items = items;
        loop {
            {
                let mut g = self.inner.lock().unwrap();
                if g.closed {
                    return Err(QueueError::Closed);
                }
                if !self.at_capacity(&g, items.len()) {
                    let n = items.len();
                    g.items.extend(items.drain(..));
                    drop(g);
                    for _ in 0..n {
                        self.items_avail.notify_one();
                    }
                    return Ok(());
                }
            }
            if timeout_at(deadline, self.space_avail.notified())
                .await
                .is_err()
            {
                return Err(QueueError::Full);
            }
        }
    }

    /// Blocks up to `wait`; `None` on timeout, never an error. A closed
    /// queue keeps yielding its remaining items, then `None` immediately.
    pub async fn dequeue_timeout(&self, wait: Duration) -> Option<T> {
        let deadline = Instant::now() + wait;
        loop {
            {
                let mut g = self.inner.lock().unwrap();
                if let Some(item) = g.items.pop_front() {
                    drop(g);
                    self.space_avail.notify_one();
                    return Some(item);
                }
                if g.closed {
                    return None;
                }
            }
            if timeout_at(deadline, self.items_avail.notified())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    /// Idempotent. Wakes every waiter; subsequent enqueues fail with
    /// `Closed`, dequeues drain what is left.
    pub fn close(&self) {
        let mut g = self.inner.lock().unwrap();
        if g.closed {
            return;
        }
        g.closed = true;
        drop(g);
        self.items_avail.notify_waiters();
        self.space_avail.notify_waiters();
    }

    fn at_capacity(&self, g: &Inner<T>, incoming: usize) -> bool {
        match self.capacity {
            Some(cap) => g.items.len() + incoming > cap,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let q = WorkQueue::bounded(8);
        q.try_enqueue(1).unwrap();
        q.try_enqueue(2).unwrap();
        q.try_enqueue(3).unwrap();
        assert_eq!(q.dequeue_timeout(Duration::from_millis(10)).await, Some(1));
        assert_eq!(q.dequeue_timeout(Duration::from_millis(10)).await, Some(2));
        assert_eq!(q.dequeue_timeout(Duration::from_millis(10)).await, Some(3));
    }

    #[tokio::test]
    async fn try_enqueue_full_at_capacity() {
        let q = WorkQueue::bounded(2);
        q.try_enqueue(1).unwrap();
        q.try_enqueue(2).unwrap();
        assert_eq!(q.try_enqueue(3), Err(QueueError::Full));
        q.dequeue_timeout(Duration::from_millis(10)).await.unwrap();
        q.try_enqueue(3).unwrap();
    }

    #[tokio::test]
    async fn dequeue_times_out_on_empty() {
        let q: WorkQueue<u32> = WorkQueue::bounded(2);
        let started = std::time::Instant::now();
        assert_eq!(q.dequeue_timeout(Duration::from_millis(30)).await, None);
        assert!(started.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn blocked_enqueue_resumes_after_dequeue() {
        let q = Arc::new(WorkQueue::bounded(1));
        q.try_enqueue(1).unwrap();

        let q2 = q.clone();
        let pusher = tokio::spawn(async move {
            q2.enqueue_timeout(2, Duration::from_secs(2)).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(q.dequeue_timeout(Duration::from_millis(10)).await, Some(1));
        pusher.await.unwrap();
        assert_eq!(q.dequeue_timeout(Duration::from_millis(10)).await, Some(2));
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let q = WorkQueue::bounded(4);
        q.try_enqueue(0).unwrap();
        q.try_enqueue(0).unwrap();

        // Three more cannot fit within the budget; nothing is admitted.
        let res = q
            .enqueue_batch(vec![1, 2, 3], Duration::from_millis(20))
            .await;
        assert_eq!(res, Err(QueueError::Full));
        assert_eq!(q.len(), 2);

        q.enqueue_batch(vec![1, 2], Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(q.len(), 4);
    }

    #[tokio::test]
    async fn oversized_batch_fails_fast() {
        let q = WorkQueue::bounded(2);
        let started = std::time::Instant::now();
        let res = q
            .enqueue_batch(vec![1, 2, 3], Duration::from_secs(5))
            .await;
        assert_eq!(res, Err(QueueError::Full));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn closed_queue_rejects_enqueue_and_drains() {
        let q = WorkQueue::bounded(4);
        q.try_enqueue(1).unwrap();
        q.close();
        q.close(); // idempotent
        assert_eq!(q.try_enqueue(2), Err(QueueError::Closed));
        assert_eq!(q.dequeue_timeout(Duration::from_millis(10)).await, Some(1));
        assert_eq!(q.dequeue_timeout(Duration::from_millis(10)).await, None);
    }

    #[tokio::test]
    async fn close_wakes_blocked_consumers() {
        let q: Arc<WorkQueue<u32>> = Arc::new(WorkQueue::bounded(1));
        let q2 = q.clone();
        let consumer =
            tokio::spawn(async move { q2.dequeue_timeout(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.close();
        assert_eq!(consumer.await.unwrap(), None);
    }

    #[tokio::test]
    async fn unbounded_never_blocks() {
        let q = WorkQueue::unbounded();
        for i in 0..10_000 {
            q.try_enqueue(i).unwrap();
        }
        assert_eq!(q.len(), 10_000);
    }
}
