//! Error types used by the admission gate and its configuration.
//!
//! This module defines two enums:
//!
//! - [`Rejection`]: the terminal outcomes of an admission attempt that did not get a slot.
//! - [`ConfigError`]: errors raised while loading a [`GateConfig`](crate::GateConfig).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! A rejection is the intended backpressure signal, not a fault of the gate.

use std::time::Duration;
use thiserror::Error;

/// # Why an admission attempt did not get a slot.
///
/// None of these are retried by the gate itself; retry policy belongs to the caller.
/// - `QueueFull`: synchronous, decided at admit-time.
/// - `WaitTimeout`: asynchronous, after waiting the configured timeout.
/// - `Aborted`: the waiter's owner went away; nobody is left to notify.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// All slots busy and the wait queue is at its configured depth.
    #[error("queue full; retry after {retry_after:?}")]
    QueueFull {
        /// Suggested back-off before retrying.
        retry_after: Duration,
    },

    /// The ticket waited `timeout` without a slot becoming free.
    #[error("no slot within {timeout:?}; retry after {retry_after:?}")]
    WaitTimeout {
        /// The configured wait timeout that elapsed.
        timeout: Duration,
        /// Suggested back-off before retrying.
        retry_after: Duration,
    },

    /// The waiter was cancelled (or dropped) before a slot was available.
    #[error("waiter aborted")]
    Aborted,
}

impl Rejection {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use loadgate::Rejection;
    /// use std::time::Duration;
    ///
    /// let r = Rejection::QueueFull { retry_after: Duration::from_secs(5) };
    /// assert_eq!(r.as_label(), "queue_full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Rejection::QueueFull { .. } => "queue_full",
            Rejection::WaitTimeout { .. } => "wait_timeout",
            Rejection::Aborted => "aborted",
        }
    }

    /// Returns a human-readable message with details about the rejection.
    pub fn as_message(&self) -> String {
        match self {
            Rejection::QueueFull { retry_after } => {
                format!("queue full; retry_after={}s", retry_after.as_secs())
            }
            Rejection::WaitTimeout {
                timeout,
                retry_after,
            } => format!(
                "wait timeout after {timeout:?}; retry_after={}s",
                retry_after.as_secs()
            ),
            Rejection::Aborted => "waiter aborted".to_string(),
        }
    }

    /// Suggested back-off for the caller.
    ///
    /// `None` for [`Rejection::Aborted`]: there is no caller left to advise.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Rejection::QueueFull { retry_after } => Some(*retry_after),
            Rejection::WaitTimeout { retry_after, .. } => Some(*retry_after),
            Rejection::Aborted => None,
        }
    }

    /// Returns `true` when the rejection must not be surfaced to anyone.
    ///
    /// # Example
    /// ```
    /// use loadgate::Rejection;
    ///
    /// assert!(Rejection::Aborted.is_silent());
    /// ```
    pub fn is_silent(&self) -> bool {
        matches!(self, Rejection::Aborted)
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting is present but is not a non-negative integer.
    #[error("invalid value for {key}: {value:?} (expected a non-negative integer)")]
    Invalid {
        /// Name of the setting.
        key: &'static str,
        /// Raw value as found.
        value: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConfigError::Invalid { key, value } => format!("invalid {key}={value:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_per_variant() {
        let full = Rejection::QueueFull {
            retry_after: Duration::from_secs(3),
        };
        let timeout = Rejection::WaitTimeout {
            timeout: Duration::from_millis(2500),
            retry_after: Duration::from_secs(3),
        };
        assert_eq!(full.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(timeout.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(Rejection::Aborted.retry_after(), None);
    }

    #[test]
    fn test_labels_are_stable() {
        let timeout = Rejection::WaitTimeout {
            timeout: Duration::from_secs(1),
            retry_after: Duration::from_secs(1),
        };
        assert_eq!(timeout.as_label(), "wait_timeout");
        assert_eq!(Rejection::Aborted.as_label(), "aborted");
        assert!(!timeout.is_silent());

        let err = ConfigError::Invalid {
            key: "MAX_PENDING_REQUESTS",
            value: "lots".into(),
        };
        assert_eq!(err.as_label(), "config_invalid");
        assert!(err.to_string().contains("MAX_PENDING_REQUESTS"));
    }
}
