//! # loadgate
//!
//! **loadgate** is a bounded concurrency admission gate for async Rust.
//!
//! It regulates how many work items run at once against a fixed budget of slots,
//! lets overflow wait in a bounded FIFO queue for a limited time, and sheds load
//! predictably once the queue is full too. An optional `tower` middleware applies
//! the gate to HTTP services, answering shed requests with `503` and `Retry-After`.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!        arrivals                arrivals                 arrivals
//!           │                       │                        │
//!           ▼                       ▼                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Gate (one per protected resource)                                │
//! │  - active  : occupied slots (≤ max_concurrent)                    │
//! │  - queue   : FIFO of tickets (≤ max_queue_depth)                  │
//! │  - limits  : resolved once from GateConfig                        │
//! │  - Bus     : broadcast of gate events                             │
//! └──────┬───────────────────┬───────────────────┬────────────────────┘
//!        ▼                   ▼                   ▼
//!   Admitted(Permit)    Queued(Ticket)      Rejected(QueueFull)
//!        │                   │
//!        │                   ├─► granted on release ─► Permit
//!        │                   ├─► deadline            ─► WaitTimeout
//!        │                   └─► cancel / drop       ─► Aborted
//!        ▼
//!   Permit::release() / drop ─► active -= 1 ─► grant oldest tickets
//!
//!   Bus ──► subscriber listener ──► SubscriberSet ──► worker per subscriber
//! ```
//!
//! ### Lifecycle
//! ```text
//! slot:   Free ──admit──► Occupied ──release──► Free   (release when Free: no-op)
//! ticket: Waiting ──► Admitted | Rejected              (terminal, exactly once)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                      |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------|
//! | **Admission**     | Admit, queue or reject against a concurrency budget.          | [`Gate`], [`TryAdmit`], [`Permit`]      |
//! | **Waiting**       | FIFO tickets with wait timeout and cancellation.              | [`Ticket`]                              |
//! | **Errors**        | Typed rejection reasons and configuration errors.             | [`Rejection`], [`ConfigError`]          |
//! | **Configuration** | Limits, defaults, environment loading.                        | [`GateConfig`], [`GateBuilder`]         |
//! | **Subscriber API**| Hook into gate events (logging, metrics, custom subscribers). | [`Subscribe`], [`Event`]                |
//!
//! ## Optional features
//! - `http` _(default)_: `tower` middleware for `http` services ([`http::ConcurrencyLimitLayer`]).
//! - `logging`: exports a simple built-in `LogWriter` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use loadgate::{Gate, GateConfig, Rejection};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = Gate::new(GateConfig {
//!         name: "reports".into(),
//!         max_concurrent: 2,
//!         max_queue_depth: 8,
//!         wait_timeout: Duration::from_secs(3),
//!         ..GateConfig::default()
//!     });
//!
//!     let cancel = CancellationToken::new();
//!     match gate.admit(&cancel).await {
//!         Ok(permit) => {
//!             // do the protected work...
//!             permit.release();
//!         }
//!         Err(Rejection::Aborted) => {}
//!         Err(busy) => println!("busy, retry after {:?}", busy.retry_after()),
//!     }
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;

#[cfg(feature = "http")]
pub mod http;

// ---- Public re-exports ----

pub use core::{
    ENV_MAX_CONCURRENT, ENV_MAX_QUEUE_DEPTH, ENV_WAIT_TIMEOUT_MS, Gate, GateBuilder, GateConfig,
    GateSnapshot, Permit, Ticket, TryAdmit,
};
pub use error::{ConfigError, Rejection};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
