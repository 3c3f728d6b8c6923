//! # Permit: one occupied slot.
//!
//! A [`Permit`] is handed out for every admitted item. Dropping it, or calling
//! [`Permit::release`], gives the slot back exactly once; the "already released"
//! flag lives in the permit, so every exit path of the item may release it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::gate::Shared;

/// RAII guard for one slot of a [`Gate`](crate::Gate).
///
/// ### Rules
/// - Created only after the slot was counted in `active`
/// - Released exactly once: on [`release`](Permit::release) or on drop, whichever comes first
/// - Releasing admits queued tickets in FIFO order
#[must_use = "dropping a permit releases its slot immediately"]
pub struct Permit {
    shared: Arc<Shared>,
    admitted_at: Instant,
    released: bool,
}

impl Permit {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            admitted_at: Instant::now(),
            released: false,
        }
    }

    /// Gives the slot back.
    pub fn release(mut self) {
        self.release_once();
    }

    /// How long the slot has been occupied.
    pub fn held(&self) -> Duration {
        self.admitted_at.elapsed()
    }

    /// Name of the gate the slot belongs to.
    pub fn gate_name(&self) -> &str {
        self.shared.name()
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.shared.release_slot(self.admitted_at.elapsed());
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("gate", &self.shared.name())
            .field("held", &self.held())
            .field("released", &self.released)
            .finish()
    }
}
