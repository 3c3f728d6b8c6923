//! Gate events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the gate, its permits and tickets,
//! and by subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Gate::try_admit`, `Permit` release, `Ticket` withdrawal,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the gate's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver handed out by `Gate::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
