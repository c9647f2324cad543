use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::SlotKey;
use crate::foundation::error::FilmResult;

/// How often a queued waiter re-checks its cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct SlotQueue {
    next_ticket: u64,
    /// Waiting tickets; the front one holds the slot.
    queue: VecDeque<u64>,
}

/// FIFO lock per render slot.
///
/// Calls on the same `(mode, slot)` run one at a time in acquisition order; distinct slots
/// never wait on each other.
#[derive(Debug, Default)]
pub(crate) struct RenderMutex {
    slots: Mutex<HashMap<SlotKey, SlotQueue>>,
    wake: Condvar,
}

/// Exclusive hold on one slot; released on drop.
#[derive(Debug)]
pub(crate) struct RenderPermit<'a> {
    owner: &'a RenderMutex,
    key: SlotKey,
    ticket: u64,
}

impl RenderMutex {
    fn lock(&self) -> MutexGuard<'_, HashMap<SlotKey, SlotQueue>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue behind earlier callers of `key`. A cancelled waiter leaves the queue and gets
    /// [`crate::FilmError::Abort`].
    pub(crate) fn acquire(
        &self,
        key: &SlotKey,
        cancel: &CancellationToken,
    ) -> FilmResult<RenderPermit<'_>> {
        let mut slots = self.lock();
        let q = slots.entry(key.clone()).or_default();
        let ticket = q.next_ticket;
        q.next_ticket += 1;
        q.queue.push_back(ticket);
        if q.queue.len() > 1 {
            tracing::debug!(slot = %key, ahead = q.queue.len() - 1, "waiting for render slot");
        }

        loop {
            let front = slots.get(key).and_then(|q| q.queue.front().copied());
            if front == Some(ticket) {
                return Ok(RenderPermit {
                    owner: self,
                    key: key.clone(),
                    ticket,
                });
            }
            if let Err(err) = cancel.check() {
                Self::withdraw(&mut slots, key, ticket);
                self.wake.notify_all();
                return Err(err);
            }
            slots = self
                .wake
                .wait_timeout(slots, CANCEL_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn withdraw(slots: &mut HashMap<SlotKey, SlotQueue>, key: &SlotKey, ticket: u64) {
        if let Some(q) = slots.get_mut(key) {
            q.queue.retain(|t| *t != ticket);
            if q.queue.is_empty() {
                slots.remove(key);
            }
        }
    }

    /// Number of callers holding or waiting for `key`.
    #[cfg(test)]
    pub(crate) fn queued(&self, key: &SlotKey) -> usize {
        self.lock().get(key).map_or(0, |q| q.queue.len())
    }
}

#[cfg(test)]
impl RenderPermit<'_> {
    pub(crate) fn key(&self) -> &SlotKey {
        &self.key
    }
}

impl Drop for RenderPermit<'_> {
    fn drop(&mut self) {
        let mut slots = self.owner.lock();
        RenderMutex::withdraw(&mut slots, &self.key, self.ticket);
        drop(slots);
        self.owner.wake.notify_all();
    }
}
