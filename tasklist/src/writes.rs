//! Ordered persistence writes.
//!
//! The store runs every effect in its own task, so two writes issued by
//! consecutive actions may start in either order. A [`WriteQueue`] hands out
//! numbered tickets while the reducer runs (under the store's write lock)
//! and lets each write proceed only after every earlier ticket has finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Serialises writes in the order their tickets were taken.
///
/// Clones share the same sequence.
#[derive(Clone, Debug)]
pub struct WriteQueue {
    issued: Arc<AtomicU64>,
    completed: Arc<watch::Sender<u64>>,
}

impl WriteQueue {
    /// Creates an empty queue
    #[must_use]
    pub fn new() -> Self {
        let (completed, _) = watch::channel(0);
        Self {
            issued: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(completed),
        }
    }

    /// Takes the next ticket.
    ///
    /// Every ticket must eventually be waited on; a dropped ticket blocks
    /// all later ones.
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        Ticket {
            number: self.issued.fetch_add(1, Ordering::AcqRel),
            completed: Arc::clone(&self.completed),
        }
    }

    /// Number of writes finished so far
    #[must_use]
    pub fn completed(&self) -> u64 {
        *self.completed.borrow()
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A place in the write sequence
#[derive(Debug)]
pub struct Ticket {
    number: u64,
    completed: Arc<watch::Sender<u64>>,
}

impl Ticket {
    /// Position in the sequence, starting at zero
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// Waits until every earlier ticket has finished.
    ///
    /// The returned [`Turn`] releases the next ticket when dropped.
    pub async fn wait(self) -> Turn {
        let number = self.number;
        let mut completed = self.completed.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = completed.wait_for(|done| *done >= number).await;

        Turn {
            completed: self.completed,
        }
    }
}

/// Exclusive right to write; releases the next ticket on drop
#[derive(Debug)]
pub struct Turn {
    completed: Arc<watch::Sender<u64>>,
}

impl Drop for Turn {
    fn drop(&mut self) {
        self.completed.send_modify(|done| *done += 1);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap
    #![allow(clippy::panic)] // Test code can panic

    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn tickets_are_numbered_in_order() {
        let queue = WriteQueue::new();
        let shared = queue.clone();

        assert_eq!(queue.ticket().number(), 0);
        assert_eq!(shared.ticket().number(), 1);
        assert_eq!(queue.ticket().number(), 2);
    }

    #[tokio::test]
    async fn later_ticket_waits_for_earlier_one() {
        let queue = WriteQueue::new();
        let first = queue.ticket();
        let second = queue.ticket();
        let log = Arc::new(Mutex::new(Vec::new()));

        let late = tokio::spawn({
            let log = Arc::clone(&log);
            async move {
                let _turn = second.wait().await;
                log.lock().unwrap().push(2);
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(log.lock().unwrap().is_empty());

        {
            let _turn = first.wait().await;
            log.lock().unwrap().push(1);
        }
        late.await.unwrap();

        assert_eq!(*log.lock().unwrap(), [1, 2]);
        assert_eq!(queue.completed(), 2);
    }

    async fn failing_write(ticket: Ticket) {
        let _turn = ticket.wait().await;
        panic!("write failed");
    }

    #[tokio::test]
    async fn panicking_writer_still_releases_its_turn() {
        let queue = WriteQueue::new();
        let first = queue.ticket();
        let second = queue.ticket();

        let failed = tokio::spawn(failing_write(first));
        assert!(failed.await.is_err());

        let turn = tokio::time::timeout(Duration::from_secs(1), second.wait()).await;
        assert!(turn.is_ok());
    }
}
