//! # Indexed FIFO of waiting tickets.
//!
//! Tickets are keyed by a monotonically increasing id, so ascending key order is
//! enqueue order. A ticket leaving early (timeout, abort) is removed by id without
//! disturbing the order of the rest. Every ticket waits for the same timeout, so
//! overdue tickets always sit at the front.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

/// Admission side of one wait ticket.
pub(super) struct Waiter {
    /// When the ticket joined the queue.
    pub enqueued_at: Instant,
    /// Fires once when the gate hands this ticket a slot.
    pub grant: oneshot::Sender<()>,
}

/// FIFO of waiters with removal by id.
pub(super) struct WaitQueue {
    entries: BTreeMap<u64, Waiter>,
    next_id: u64,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Appends a waiter and returns its ticket id.
    pub fn push(&mut self, waiter: Waiter) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, waiter);
        id
    }

    /// Takes the oldest waiter.
    pub fn pop_front(&mut self) -> Option<(u64, Waiter)> {
        self.entries.pop_first()
    }

    /// Takes the oldest waiter if it has been waiting for longer than `timeout`.
    pub fn pop_expired(&mut self, now: Instant, timeout: Duration) -> Option<(u64, Waiter)> {
        let entry = self.entries.first_entry()?;
        if entry.get().enqueued_at + timeout >= now {
            return None;
        }
        Some(entry.remove_entry())
    }

    /// Removes a specific waiter; `None` if it already left the queue.
    pub fn remove(&mut self, id: u64) -> Option<Waiter> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
