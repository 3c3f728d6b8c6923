//! # Event subscribers for the admission gate.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for handling gate events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Gate ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                   │
//!                                                     ┌─────────────┼─────────────┐
//!                                                     ▼             ▼             ▼
//!                                                 LogWriter      Metrics       Custom
//! ```
//!
//! Subscribers are attached at build time with
//! [`GateBuilder::with_subscribers`](crate::GateBuilder::with_subscribers).

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
