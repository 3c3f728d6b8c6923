//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [admitted] gate="api" active=20 queued=3 ticket=41 waited=120ms
//! [queued] gate="api" ticket=44 active=20 queued=4
//! [queue-full] gate="api" active=20 queued=100 retry_after=15s
//! [wait-timeout] gate="api" ticket=12 waited=15000ms retry_after=15s
//! [aborted] gate="api" ticket=13 waited=310ms
//! [released] gate="api" active=19 queued=0 held=48ms
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let gate = e.gate.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::Admitted => match e.ticket {
                Some(ticket) => println!(
                    "[admitted] gate={gate:?} active={} queued={} ticket={ticket} waited={}ms",
                    show(e.active), show(e.queued), show(e.waited_ms)
                ),
                None => println!(
                    "[admitted] gate={gate:?} active={} queued={}",
                    show(e.active), show(e.queued)
                ),
            },
            EventKind::Queued => {
                println!(
                    "[queued] gate={gate:?} ticket={} active={} queued={}",
                    show(e.ticket), show(e.active), show(e.queued)
                );
            }
            EventKind::Released => {
                println!(
                    "[released] gate={gate:?} active={} queued={} held={}ms",
                    show(e.active), show(e.queued), show(e.held_ms)
                );
            }
            EventKind::QueueFull => {
                println!(
                    "[queue-full] gate={gate:?} active={} queued={} retry_after={}s",
                    show(e.active), show(e.queued), show(e.retry_after_s)
                );
            }
            EventKind::WaitTimeout => {
                println!(
                    "[wait-timeout] gate={gate:?} ticket={} waited={}ms retry_after={}s",
                    show(e.ticket), show(e.waited_ms), show(e.retry_after_s)
                );
            }
            EventKind::Aborted => {
                println!(
                    "[aborted] gate={gate:?} ticket={} waited={}ms",
                    show(e.ticket), show(e.waited_ms)
                );
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={gate} reason={}",
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={gate} info={}",
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

fn show<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const KINDS: [EventKind; 8] = [
        EventKind::Admitted,
        EventKind::Queued,
        EventKind::Released,
        EventKind::QueueFull,
        EventKind::WaitTimeout,
        EventKind::Aborted,
        EventKind::SubscriberOverflow,
        EventKind::SubscriberPanicked,
    ];

    #[tokio::test]
    async fn test_prints_every_kind() {
        let writer = LogWriter::new();
        for kind in KINDS {
            writer.on_event(&Event::new(kind)).await;
            writer
                .on_event(
                    &Event::new(kind)
                        .with_gate("api")
                        .with_ticket(7)
                        .with_occupancy(20, 3)
                        .with_waited(Duration::from_millis(120))
                        .with_held(Duration::from_millis(48))
                        .with_retry_after(Duration::from_secs(15))
                        .with_reason("full"),
                )
                .await;
        }
    }

    #[test]
    fn test_show_renders_missing_fields_as_dash() {
        assert_eq!(show(Some(3u32)), "3");
        assert_eq!(show(None::<u32>), "-");
    }
}
