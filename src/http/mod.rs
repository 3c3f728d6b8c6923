//! # HTTP load shedding.
//!
//! A [`tower`] middleware that puts a [`Gate`](crate::Gate) in front of an
//! `http::Request` → `http::Response` service.
//!
//! ## Behaviour
//! ```text
//! request
//!   ├─► OPTIONS                ─► inner service (gate untouched)
//!   ├─► Admitted               ─► inner service ─► body holds the permit until it ends
//!   ├─► Queued ─► granted      ─► inner service ─► (same)
//!   │          ├► WaitTimeout  ─► 503 + Retry-After + {"message": ...}
//!   │          └► Aborted      ─► bare 503 (nobody is listening)
//!   └─► QueueFull              ─► 503 + Retry-After + {"message": ...}
//! ```
//!
//! A [`CancellationToken`](tokio_util::sync::CancellationToken) placed in the request
//! extensions withdraws the request from the queue when it fires; dropping the
//! response future does the same.
//!
//! ## Example
//! ```rust
//! use std::convert::Infallible;
//! use http::{Request, Response};
//! use tower::{Layer, service_fn};
//! use loadgate::{Gate, GateConfig, http::ConcurrencyLimitLayer};
//!
//! let gate = Gate::new(GateConfig::default());
//! let svc = ConcurrencyLimitLayer::new(gate).layer(service_fn(|_req: Request<()>| async {
//!     Ok::<_, Infallible>(Response::new(String::from("ok")))
//! }));
//! # let _ = svc;
//! ```

mod body;
mod layer;
mod response;
mod service;

pub use body::PermitBody;
pub use layer::ConcurrencyLimitLayer;
pub use service::ConcurrencyLimit;
