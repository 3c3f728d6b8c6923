use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use super::{config::GateConfig, gate::Gate};
use crate::{
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Gate`] with optional features.
pub struct GateBuilder {
    cfg: GateConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl GateBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: GateConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive gate events (admissions, rejections, releases)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the gate.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Subscriber workers and the listener feeding them (only if subscribers were given;
    ///   this part must run inside a tokio runtime)
    ///
    /// The listener stops once the last clone of the gate and all its permits and tickets are gone.
    pub fn build(self) -> Gate {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let closed = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            spawn_listener(bus.subscribe(), set, closed.clone());
        }
        Gate::from_parts(self.cfg, bus, closed)
    }
}

/// Forwards bus events to the subscriber set until the gate is gone.
fn spawn_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    closed: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        set.emit_arc(Arc::new(
                            Event::new(EventKind::SubscriberOverflow)
                                .with_gate("subscriber-listener")
                                .with_reason(format!("lagged skipped={skipped}")),
                        ));
                    }
                },
                _ = closed.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}
