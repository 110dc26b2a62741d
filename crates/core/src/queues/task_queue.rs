use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::sync::Notify;

/// Shared FIFO drained by a fixed set of workers.
///
/// `pending` counts items not yet completed, including ones currently held
/// by a worker. `next` only returns `None` once that count reaches zero, so a
/// worker never exits while another may still requeue a retry.
pub struct TaskQueue<T> {
    buf: Mutex<VecDeque<T>>,
    pending: AtomicUsize,
    notify: Notify,
}

impl<T> TaskQueue<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let buf: VecDeque<T> = items.into_iter().collect();
        Self {
            pending: AtomicUsize::new(buf.len()),
            buf: Mutex::new(buf),
            notify: Notify::new(),
        }
    }

    /// Puts a dequeued item back without changing the pending count.
    pub fn requeue(&self, value: T) {
        self.buf
            .lock()
            .expect("TaskQueue poisoned")
            .push_back(value);
        self.notify.notify_one();
    }

    /// Marks one dequeued item as done for good.
    pub fn complete_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn try_recv(&self) -> Option<T> {
        self.buf.lock().expect("TaskQueue poisoned").pop_front()
    }

    /// Waits for the next item. `None` means every item has completed.
    pub async fn next(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_recv() {
                return Some(value);
            }
            if self.pending() == 0 {
                return None;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_then_reports_done() {
        let q = TaskQueue::new([1, 2]);
        assert_eq!(q.next().await, Some(1));
        q.complete_one();
        assert_eq!(q.next().await, Some(2));
        q.complete_one();
        assert_eq!(q.next().await, None);
    }

    #[tokio::test]
    async fn requeued_item_comes_back() {
        let q = TaskQueue::new(["a"]);
        let item = q.next().await.unwrap();
        q.requeue(item);
        assert_eq!(q.pending(), 1);
        assert_eq!(q.next().await, Some("a"));
    }
}
