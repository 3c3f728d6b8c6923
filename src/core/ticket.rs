//! # Ticket: one item waiting for a slot.
//!
//! A [`Ticket`] is created when an item arrives while every slot is busy and the
//! wait queue still has room. It resolves exactly once:
//!
//! ```text
//! Waiting ──► slot granted by a release ──► Ok(Permit)
//!         ├─► deadline reached         ──► Err(WaitTimeout)
//!         ├─► cancellation token fired ──► Err(Aborted)
//!         └─► ticket dropped           ──► (Aborted, nobody to tell)
//! ```
//!
//! ## Races
//! The gate may grant a slot at the same instant the deadline fires or the owner
//! cancels. Whoever removes the ticket from the queue first under the gate lock wins:
//! - grant vs timeout: the grant wins, the ticket resolves admitted;
//! - grant vs cancel: the slot is given straight back and the ticket resolves `Aborted`.
//!
//! The deadline is measured from enqueue, not from the first poll of [`Ticket::wait`].
//! A ticket nobody is polling still expires: the gate evicts overdue tickets on its
//! next transition and closes their grant channel, which `wait` reports as `WaitTimeout`.

use std::fmt;
use std::future;
use std::sync::Arc;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::gate::Shared;
use super::permit::Permit;
use crate::error::Rejection;

/// Pending admission handed out by [`Gate::try_admit`](crate::Gate::try_admit).
#[must_use = "dropping a ticket withdraws it from the wait queue"]
pub struct Ticket {
    shared: Arc<Shared>,
    id: u64,
    enqueued_at: Instant,
    deadline: Option<Instant>,
    grant: oneshot::Receiver<()>,
    resolved: bool,
}

/// What woke a waiting ticket.
enum Wake {
    Granted(bool),
    Cancelled,
    Expired,
}

impl Ticket {
    pub(super) fn new(
        shared: Arc<Shared>,
        id: u64,
        enqueued_at: Instant,
        grant: oneshot::Receiver<()>,
    ) -> Self {
        let deadline = shared.limits().wait_timeout.map(|t| enqueued_at + t);
        Self {
            shared,
            id,
            enqueued_at,
            deadline,
            grant,
            resolved: false,
        }
    }

    /// Position-independent ticket id; lower ids were enqueued earlier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// When the ticket joined the wait queue.
    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// When the ticket will be evicted, if the gate has a wait timeout.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Waits until the ticket resolves.
    ///
    /// Returns the [`Permit`] once a slot is handed over, `WaitTimeout` when the
    /// deadline passes first, or `Aborted` when `cancel` fires first.
    pub async fn wait(mut self, cancel: &CancellationToken) -> Result<Permit, Rejection> {
        if cancel.is_cancelled() {
            return self.withdraw(Rejection::Aborted);
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        let wake = tokio::select! {
            biased;
            granted = &mut self.grant => Wake::Granted(granted.is_ok()),
            _ = cancel.cancelled() => Wake::Cancelled,
            _ = &mut expired => Wake::Expired,
        };

        match wake {
            Wake::Granted(true) => {
                self.resolved = true;
                Ok(Permit::new(Arc::clone(&self.shared)))
            }
            // Sender dropped without a grant: the gate evicted the overdue ticket.
            Wake::Granted(false) => {
                self.resolved = true;
                Err(self.timed_out())
            }
            Wake::Cancelled => self.withdraw(Rejection::Aborted),
            Wake::Expired => {
                let reason = self.timed_out();
                self.withdraw(reason)
            }
        }
    }

    fn timed_out(&self) -> Rejection {
        let limits = self.shared.limits();
        Rejection::WaitTimeout {
            timeout: limits.wait_timeout.unwrap_or_default(),
            retry_after: limits.retry_after,
        }
    }

    /// Leaves the queue with `reason`, unless a slot was granted first.
    fn withdraw(&mut self, reason: Rejection) -> Result<Permit, Rejection> {
        self.resolved = true;
        if self.shared.withdraw(self.id, reason) {
            return Err(reason);
        }
        match self.grant.try_recv() {
            Ok(()) => {}
            Err(TryRecvError::Closed) => return Err(self.timed_out()),
            Err(TryRecvError::Empty) => return Err(reason),
        }

        let permit = Permit::new(Arc::clone(&self.shared));
        if reason.is_silent() {
            permit.release();
            return Err(reason);
        }
        Ok(permit)
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if !self.resolved {
            let _ = self.withdraw(Rejection::Aborted);
        }
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("gate", &self.shared.name())
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .field("resolved", &self.resolved)
            .finish()
    }
}
