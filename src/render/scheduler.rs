use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::render::job::Priority;

/// Concurrency slots handed out by priority, FIFO within a priority.
///
/// Jobs register when submitted, so the grant order never depends on task start-up order.
pub(crate) struct SlotScheduler {
    state: Mutex<SlotState>,
}

struct SlotState {
    free: usize,
    next_seq: u64,
    ready: BinaryHeap<(Priority, Reverse<u64>)>,
    waiters: HashMap<u64, oneshot::Sender<SlotPermit>>,
}

/// A held slot; dropping it passes the slot to the best waiter.
pub(crate) struct SlotPermit {
    scheduler: Option<Arc<SlotScheduler>>,
}

/// Result of [`SlotScheduler::enqueue`].
pub(crate) enum SlotTicket {
    Granted(SlotPermit),
    Waiting(oneshot::Receiver<SlotPermit>),
}

impl SlotTicket {
    /// Wait for the slot. `None` when the scheduler dropped the waiter.
    pub(crate) async fn acquire(self) -> Option<SlotPermit> {
        match self {
            Self::Granted(p) => Some(p),
            Self::Waiting(rx) => rx.await.ok(),
        }
    }
}

impl SlotScheduler {
    pub(crate) fn new(slots: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState {
                free: slots,
                next_seq: 0,
                ready: BinaryHeap::new(),
                waiters: HashMap::new(),
            }),
        })
    }

    /// Take a free slot now, or join the wait queue at `priority`.
    pub(crate) fn enqueue(self: &Arc<Self>, priority: Priority) -> SlotTicket {
        let mut state = self.state.lock();
        if state.free > 0 && state.ready.is_empty() {
            state.free -= 1;
            return SlotTicket::Granted(SlotPermit {
                scheduler: Some(Arc::clone(self)),
            });
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        let (tx, rx) = oneshot::channel();
        state.ready.push((priority, Reverse(seq)));
        state.waiters.insert(seq, tx);
        SlotTicket::Waiting(rx)
    }

    /// Number of registered waiters, including ones whose job already gave up.
    pub(crate) fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn release(self: &Arc<Self>) {
        loop {
            // Send outside the lock: a refused permit is dropped here and must not re-enter.
            let tx = {
                let mut state = self.state.lock();
                let Some((_, Reverse(seq))) = state.ready.pop() else {
                    state.free += 1;
                    return;
                };
                match state.waiters.remove(&seq) {
                    Some(tx) => tx,
                    None => continue,
                }
            };
            let permit = SlotPermit {
                scheduler: Some(Arc::clone(self)),
            };
            match tx.send(permit) {
                Ok(()) => return,
                Err(mut refused) => refused.scheduler = None,
            }
        }
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.release();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
