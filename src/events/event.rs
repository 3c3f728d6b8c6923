//! # Events emitted by the admission gate.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Admission events**: a slot was granted, or an item started waiting
//! - **Rejection events**: queue full, wait timeout, aborted waiter
//! - **Subscriber events**: delivery problems inside the subscriber set
//!
//! The [`Event`] struct carries additional metadata such as timestamps, gate name,
//! ticket id, occupancy, and wait/hold durations.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use loadgate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Queued)
//!     .with_gate("api")
//!     .with_ticket(7)
//!     .with_occupancy(20, 3);
//!
//! assert_eq!(ev.kind, EventKind::Queued);
//! assert_eq!(ev.gate.as_deref(), Some("api"));
//! assert_eq!(ev.queued, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of gate events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `gate`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `gate`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Admission events ===
    /// A slot was granted.
    ///
    /// Sets:
    /// - `gate`, `active`, `queued`
    /// - `ticket`, `waited_ms`: only when the item came out of the wait queue
    Admitted,

    /// All slots were busy; the item joined the wait queue.
    ///
    /// Sets:
    /// - `gate`, `ticket`, `active`, `queued`
    Queued,

    /// A slot was given back.
    ///
    /// Sets:
    /// - `gate`, `active`, `queued`
    /// - `held_ms`: how long the slot was occupied
    Released,

    // === Rejection events ===
    /// All slots and the whole wait queue were occupied.
    ///
    /// Sets:
    /// - `gate`, `active`, `queued`, `retry_after_s`
    QueueFull,

    /// A waiter was evicted after the configured wait timeout.
    ///
    /// Sets:
    /// - `gate`, `ticket`, `waited_ms`, `retry_after_s`
    WaitTimeout,

    /// A waiter's owner cancelled or went away.
    ///
    /// Sets:
    /// - `gate`, `ticket`, `waited_ms`
    Aborted,
}

/// Gate event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the gate (or of the subscriber, for subscriber events).
    pub gate: Option<Arc<str>>,
    /// Wait ticket id, if the event concerns a queued item.
    pub ticket: Option<u64>,
    /// Occupied slots after the transition.
    pub active: Option<u32>,
    /// Wait queue length after the transition.
    pub queued: Option<u32>,
    /// Time spent in the wait queue in milliseconds (compact).
    pub waited_ms: Option<u32>,
    /// Time a slot was held in milliseconds (compact).
    pub held_ms: Option<u32>,
    /// Retry-after hint given to the rejected caller, in seconds.
    pub retry_after_s: Option<u32>,
    /// Human-readable reason (overflow details, panic info, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            gate: None,
            ticket: None,
            active: None,
            queued: None,
            waited_ms: None,
            held_ms: None,
            retry_after_s: None,
            reason: None,
        }
    }

    /// Attaches a gate name.
    #[inline]
    pub fn with_gate(mut self, gate: impl Into<Arc<str>>) -> Self {
        self.gate = Some(gate.into());
        self
    }

    /// Attaches a wait ticket id.
    #[inline]
    pub fn with_ticket(mut self, id: u64) -> Self {
        self.ticket = Some(id);
        self
    }

    /// Attaches occupancy after the transition.
    #[inline]
    pub fn with_occupancy(mut self, active: usize, queued: usize) -> Self {
        self.active = Some(compact(active as u128));
        self.queued = Some(compact(queued as u128));
        self
    }

    /// Attaches time spent waiting (stored as milliseconds).
    #[inline]
    pub fn with_waited(mut self, d: Duration) -> Self {
        self.waited_ms = Some(compact(d.as_millis()));
        self
    }

    /// Attaches time a slot was held (stored as milliseconds).
    #[inline]
    pub fn with_held(mut self, d: Duration) -> Self {
        self.held_ms = Some(compact(d.as_millis()));
        self
    }

    /// Attaches a retry-after hint (stored as whole seconds).
    #[inline]
    pub fn with_retry_after(mut self, d: Duration) -> Self {
        self.retry_after_s = Some(compact(d.as_secs() as u128));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_gate(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_gate(subscriber)
            .with_reason(info)
    }

    /// Returns `true` for `QueueFull`, `WaitTimeout` and `Aborted`.
    #[inline]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.kind,
            EventKind::QueueFull | EventKind::WaitTimeout | EventKind::Aborted
        )
    }
}

#[inline]
fn compact(v: u128) -> u32 {
    v.min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::Admitted);
        let b = Event::new(EventKind::Released);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_durations_saturate() {
        let ev = Event::new(EventKind::Released)
            .with_held(Duration::from_secs(u64::MAX))
            .with_waited(Duration::from_millis(42));
        assert_eq!(ev.held_ms, Some(u32::MAX));
        assert_eq!(ev.waited_ms, Some(42));
    }

    #[test]
    fn test_rejection_kinds() {
        assert!(Event::new(EventKind::QueueFull).is_rejection());
        assert!(Event::new(EventKind::Aborted).is_rejection());
        assert!(!Event::new(EventKind::Queued).is_rejection());
    }
}
