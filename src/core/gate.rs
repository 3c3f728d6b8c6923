//! # Gate: bounded concurrency admission control.
//!
//! The [`Gate`] regulates concurrent execution of arriving work items against a
//! fixed budget of slots, queues overflow while busy and sheds load once the wait
//! queue is full too.
//!
//! ## Admission flow
//! ```text
//! try_admit()
//!   ├─► evict overdue tickets          ─► WaitTimeout
//!   ├─► active < max_concurrent        ─► active += 1 ─► Admitted(Permit)
//!   ├─► queue.len() >= max_queue_depth ─► Rejected(QueueFull)      (no ticket)
//!   └─► otherwise                      ─► push ticket ─► Queued(Ticket)
//!
//! Permit released (explicit or drop)
//!   ├─► active -= 1 (saturating)
//!   ├─► evict overdue tickets
//!   └─► while active < max_concurrent && queue not empty:
//!          pop oldest ticket ─► active += 1 ─► grant
//! ```
//!
//! ## Rules
//! - `0 <= active <= max_concurrent` at every observation point
//! - `queue.len() <= max_queue_depth`; excess is rejected, never queued
//! - Tickets are granted strictly in enqueue order
//! - Every ticket resolves exactly once (grant, timeout or abort)
//! - An overdue ticket is never granted and never counts against the queue depth,
//!   whether or not its owner is polling it
//! - All transitions happen inside one short critical section; events are
//!   published after the lock is dropped
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use loadgate::{Gate, GateConfig, Rejection, TryAdmit};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let gate = Gate::new(GateConfig {
//!         max_concurrent: 1,
//!         max_queue_depth: 0,
//!         ..GateConfig::default()
//!     });
//!
//!     let first = gate.admit(&CancellationToken::new()).await.unwrap();
//!     assert!(matches!(gate.try_admit(), TryAdmit::Rejected(Rejection::QueueFull { .. })));
//!
//!     first.release();
//!     assert_eq!(gate.snapshot().active, 0);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::builder::GateBuilder;
use super::config::GateConfig;
use super::permit::Permit;
use super::queue::{WaitQueue, Waiter};
use super::ticket::Ticket;
use crate::error::Rejection;
use crate::events::{Bus, Event, EventKind};

/// Limits resolved from [`GateConfig`] once, at build time.
#[derive(Clone, Copy, Debug)]
pub(super) struct Limits {
    pub max_concurrent: usize,
    pub max_queue_depth: usize,
    pub wait_timeout: Option<Duration>,
    pub retry_after: Duration,
}

/// Lifetime counters.
#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    admitted: u64,
    enqueued: u64,
    queue_full: u64,
    timed_out: u64,
    aborted: u64,
    released: u64,
}

/// Mutable gate state, guarded by one lock.
struct State {
    active: usize,
    queue: WaitQueue,
    counters: Counters,
}

/// State shared by the gate handle, its permits and its tickets.
pub(super) struct Shared {
    name: Arc<str>,
    cfg: GateConfig,
    limits: Limits,
    state: Mutex<State>,
    bus: Bus,
    closed: CancellationToken,
}

/// Point-in-time view of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Occupied slots.
    pub active: usize,
    /// Tickets currently waiting.
    pub queued: usize,
    /// Resolved concurrency ceiling.
    pub max_concurrent: usize,
    /// Resolved wait queue depth.
    pub max_queue_depth: usize,
    /// Slots granted so far (fast path and from the queue).
    pub admitted: u64,
    /// Tickets ever created.
    pub enqueued: u64,
    /// Arrivals rejected because the queue was full.
    pub queue_full: u64,
    /// Tickets evicted by the wait timeout.
    pub timed_out: u64,
    /// Tickets withdrawn by their owner.
    pub aborted: u64,
    /// Slots given back.
    pub released: u64,
}

/// Outcome of the synchronous admission step.
#[derive(Debug)]
#[must_use]
pub enum TryAdmit {
    /// A slot was free; the item may run now.
    Admitted(Permit),
    /// All slots busy; the item waits on the ticket.
    Queued(Ticket),
    /// All slots busy and the queue is full.
    Rejected(Rejection),
}

/// Admission gate for one protected resource.
///
/// Cheap to clone: clones share the same slots and queue.
#[derive(Clone)]
pub struct Gate {
    shared: Arc<Shared>,
}

impl Gate {
    /// Creates a gate without subscribers.
    pub fn new(cfg: GateConfig) -> Self {
        GateBuilder::new(cfg).build()
    }

    /// Returns a builder for a gate with subscribers attached.
    pub fn builder(cfg: GateConfig) -> GateBuilder {
        GateBuilder::new(cfg)
    }

    pub(super) fn from_parts(cfg: GateConfig, bus: Bus, closed: CancellationToken) -> Self {
        let limits = Limits {
            max_concurrent: cfg.max_concurrent_clamped(),
            max_queue_depth: cfg.max_queue_depth,
            wait_timeout: cfg.wait_timeout_opt(),
            retry_after: cfg.retry_after(),
        };
        let shared = Shared {
            name: Arc::from(cfg.name.as_str()),
            cfg,
            limits,
            state: Mutex::new(State {
                active: 0,
                queue: WaitQueue::new(),
                counters: Counters::default(),
            }),
            bus,
            closed,
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Name of the gate.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Configuration the gate was built from.
    pub fn config(&self) -> &GateConfig {
        &self.shared.cfg
    }

    /// Back-off suggested to rejected callers.
    pub fn retry_after(&self) -> Duration {
        self.shared.limits.retry_after
    }

    /// Synchronous admission step.
    ///
    /// Never waits: either takes a free slot, joins the wait queue, or rejects.
    pub fn try_admit(&self) -> TryAdmit {
        let shared = &self.shared;
        let limits = shared.limits;
        let mut st = shared.state.lock();
        let evicted = shared.evict_expired(&mut st);

        if st.active < limits.max_concurrent {
            st.active += 1;
            st.counters.admitted += 1;
            let (active, queued) = (st.active, st.queue.len());
            drop(st);

            shared.publish_evicted(evicted);
            shared.publish(Event::new(EventKind::Admitted).with_occupancy(active, queued));
            return TryAdmit::Admitted(Permit::new(Arc::clone(shared)));
        }

        if st.queue.len() >= limits.max_queue_depth {
            st.counters.queue_full += 1;
            let (active, queued) = (st.active, st.queue.len());
            drop(st);

            shared.publish_evicted(evicted);
            shared.publish(
                Event::new(EventKind::QueueFull)
                    .with_occupancy(active, queued)
                    .with_retry_after(limits.retry_after),
            );
            return TryAdmit::Rejected(Rejection::QueueFull {
                retry_after: limits.retry_after,
            });
        }

        let (grant, rx) = oneshot::channel();
        let enqueued_at = Instant::now();
        let id = st.queue.push(Waiter { enqueued_at, grant });
        st.counters.enqueued += 1;
        let (active, queued) = (st.active, st.queue.len());
        drop(st);

        shared.publish_evicted(evicted);
        shared.publish(
            Event::new(EventKind::Queued)
                .with_ticket(id)
                .with_occupancy(active, queued),
        );
        TryAdmit::Queued(Ticket::new(Arc::clone(shared), id, enqueued_at, rx))
    }

    /// Admits one item, waiting in the queue if needed.
    ///
    /// `cancel` withdraws the wait with [`Rejection::Aborted`]; dropping the
    /// returned future does the same.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<Permit, Rejection> {
        match self.try_admit() {
            TryAdmit::Admitted(permit) => Ok(permit),
            TryAdmit::Rejected(rejection) => Err(rejection),
            TryAdmit::Queued(ticket) => ticket.wait(cancel).await,
        }
    }

    /// Admits one item, runs `fut` while holding the slot, then releases it.
    pub async fn run<F>(&self, cancel: &CancellationToken, fut: F) -> Result<F::Output, Rejection>
    where
        F: Future,
    {
        let permit = self.admit(cancel).await?;
        let out = fut.await;
        permit.release();
        Ok(out)
    }

    /// Returns a point-in-time view of occupancy and counters.
    pub fn snapshot(&self) -> GateSnapshot {
        let limits = self.shared.limits;
        let mut st = self.shared.state.lock();
        let evicted = self.shared.evict_expired(&mut st);
        let snap = GateSnapshot {
            active: st.active,
            queued: st.queue.len(),
            max_concurrent: limits.max_concurrent,
            max_queue_depth: limits.max_queue_depth,
            admitted: st.counters.admitted,
            enqueued: st.counters.enqueued,
            queue_full: st.counters.queue_full,
            timed_out: st.counters.timed_out,
            aborted: st.counters.aborted,
            released: st.counters.released,
        };
        drop(st);

        self.shared.publish_evicted(evicted);
        snap
    }

    /// Creates a receiver for this gate's subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("name", &self.shared.name)
            .field("limits", &self.shared.limits)
            .finish_non_exhaustive()
    }
}

impl Shared {
    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn limits(&self) -> Limits {
        self.limits
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_gate(Arc::clone(&self.name)));
    }

    /// Gives one slot back and grants freed slots to the oldest tickets.
    ///
    /// Saturates at zero: a surplus release never admits beyond `max_concurrent`.
    pub(super) fn release_slot(&self, held: Duration) {
        let mut granted = Vec::new();
        let mut st = self.state.lock();

        if st.active > 0 {
            st.active -= 1;
            st.counters.released += 1;
        }
        let evicted = self.evict_expired(&mut st);
        let after_release = (st.active, st.queue.len());

        while st.active < self.limits.max_concurrent {
            let Some((id, waiter)) = st.queue.pop_front() else {
                break;
            };
            if waiter.grant.send(()).is_ok() {
                st.active += 1;
                st.counters.admitted += 1;
                granted.push((id, waiter.enqueued_at.elapsed(), st.active, st.queue.len()));
            }
        }
        drop(st);

        self.publish_evicted(evicted);
        self.publish(
            Event::new(EventKind::Released)
                .with_occupancy(after_release.0, after_release.1)
                .with_held(held),
        );
        for (id, waited, active, queued) in granted {
            self.publish(
                Event::new(EventKind::Admitted)
                    .with_ticket(id)
                    .with_waited(waited)
                    .with_occupancy(active, queued),
            );
        }
    }

    /// Drops tickets whose deadline has passed, closing their grant channel.
    ///
    /// Runs on every state transition so expiry does not depend on the owner
    /// polling its ticket. Returns the events to publish once the lock is gone.
    fn evict_expired(&self, st: &mut State) -> Vec<Event> {
        let Some(timeout) = self.limits.wait_timeout else {
            return Vec::new();
        };
        let now = Instant::now();
        let mut evicted = Vec::new();
        while let Some((id, waiter)) = st.queue.pop_expired(now, timeout) {
            st.counters.timed_out += 1;
            evicted.push(
                Event::new(EventKind::WaitTimeout)
                    .with_ticket(id)
                    .with_waited(now.saturating_duration_since(waiter.enqueued_at))
                    .with_occupancy(st.active, st.queue.len())
                    .with_retry_after(self.limits.retry_after),
            );
        }
        evicted
    }

    fn publish_evicted(&self, evicted: Vec<Event>) {
        for ev in evicted {
            self.publish(ev);
        }
    }

    /// Removes a ticket from the queue with `reason`.
    ///
    /// Returns `false` if the ticket already left the queue, i.e. was granted or evicted.
    pub(super) fn withdraw(&self, id: u64, reason: Rejection) -> bool {
        let mut st = self.state.lock();
        let Some(waiter) = st.queue.remove(id) else {
            return false;
        };
        let kind = match reason {
            Rejection::QueueFull { .. } => {
                st.counters.queue_full += 1;
                EventKind::QueueFull
            }
            Rejection::WaitTimeout { .. } => {
                st.counters.timed_out += 1;
                EventKind::WaitTimeout
            }
            Rejection::Aborted => {
                st.counters.aborted += 1;
                EventKind::Aborted
            }
        };
        let (active, queued) = (st.active, st.queue.len());
        drop(st);

        let mut ev = Event::new(kind)
            .with_ticket(id)
            .with_waited(waiter.enqueued_at.elapsed())
            .with_occupancy(active, queued);
        if let Some(retry_after) = reason.retry_after() {
            ev = ev.with_retry_after(retry_after);
        }
        self.publish(ev);
        true
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}
