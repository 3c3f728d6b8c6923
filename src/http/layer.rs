use tower::Layer;

use super::service::ConcurrencyLimit;
use crate::Gate;

/// Applies a shared [`Gate`] to every service it wraps.
///
/// All services produced by one layer draw from the same slots and queue.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimitLayer {
    gate: Gate,
}

impl ConcurrencyLimitLayer {
    /// Creates a layer around `gate`.
    pub fn new(gate: Gate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for ConcurrencyLimitLayer {
    type Service = ConcurrencyLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ConcurrencyLimit::new(inner, self.gate.clone())
    }
}
