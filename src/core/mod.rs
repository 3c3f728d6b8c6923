//! Gate core: admission, waiting and release.
//!
//! This module contains the implementation of the admission gate. The public API
//! from this module is [`Gate`] with its [`Permit`] and [`Ticket`] handles, plus
//! configuration ([`GateConfig`], [`GateBuilder`]).
//!
//! Internal modules:
//! - [`gate`]: the policy object, shared state and counters;
//! - [`queue`]: indexed FIFO of waiting tickets;
//! - [`ticket`]: one waiting item (timeout, cancellation, grant);
//! - [`permit`]: one occupied slot, released exactly once;
//! - [`config`]: limits, defaults and environment loading;
//! - [`builder`]: gate construction and subscriber wiring.

mod builder;
mod config;
mod gate;
mod permit;
mod queue;
mod ticket;

pub use builder::GateBuilder;
pub use config::{ENV_MAX_CONCURRENT, ENV_MAX_QUEUE_DEPTH, ENV_WAIT_TIMEOUT_MS, GateConfig};
pub use gate::{Gate, GateSnapshot, TryAdmit};
pub use permit::Permit;
pub use ticket::Ticket;
