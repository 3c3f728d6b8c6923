//! # Gate configuration.
//!
//! Provides [`GateConfig`] centralized settings for one admission gate.
//!
//! Config is used in two ways:
//! 1. **Gate creation**: `Gate::new(config)` or `Gate::builder(config)`
//! 2. **Environment loading**: `GateConfig::from_env()`
//!
//! ## Sentinel values
//! - `wait_timeout = 0s` → waiters never time out
//! - `max_queue_depth = 0` → no waiting at all; busy means rejected
//! - `max_concurrent = 0` → clamped to 1
//!
//! ## Environment
//! | Variable                   | Field             | Default | Accepted     |
//! |----------------------------|-------------------|---------|--------------|
//! | `MAX_CONCURRENT_REQUESTS`  | `max_concurrent`  | `20`    | integer ≥ 1  |
//! | `MAX_PENDING_REQUESTS`     | `max_queue_depth` | `100`   | integer ≥ 0  |
//! | `REQUEST_QUEUE_TIMEOUT_MS` | `wait_timeout`    | `15000` | integer ≥ 0  |
//!
//! Only a config built in code can carry `max_concurrent = 0` (and get it clamped);
//! the environment rejects it.

use std::time::Duration;

use crate::error::ConfigError;

/// Environment key for [`GateConfig::max_concurrent`].
pub const ENV_MAX_CONCURRENT: &str = "MAX_CONCURRENT_REQUESTS";
/// Environment key for [`GateConfig::max_queue_depth`].
pub const ENV_MAX_QUEUE_DEPTH: &str = "MAX_PENDING_REQUESTS";
/// Environment key for [`GateConfig::wait_timeout`] (milliseconds).
pub const ENV_WAIT_TIMEOUT_MS: &str = "REQUEST_QUEUE_TIMEOUT_MS";

/// Configuration of a single admission gate.
///
/// Defines:
/// - **Concurrency budget**: slots that may be occupied simultaneously
/// - **Wait queue**: how many items may wait and for how long
/// - **Backpressure hints**: retry-after default and busy message
/// - **Event system**: bus capacity for event delivery
///
/// ## Notes
/// All fields are public for flexibility. The gate reads them once, through the
/// clamping accessors, when it is built; changing a config afterwards has no effect
/// on an existing gate.
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Name of the gate (shows up in events and logs).
    pub name: String,

    /// Hard ceiling on simultaneously admitted items (min 1; clamped).
    pub max_concurrent: usize,

    /// Maximum number of items allowed to wait when all slots are busy.
    ///
    /// Excess arrivals are rejected immediately with `QueueFull`.
    pub max_queue_depth: usize,

    /// Maximum time an item may wait for a slot.
    ///
    /// - `Duration::ZERO` = wait indefinitely
    /// - `> 0` = waiter is evicted with `WaitTimeout`
    pub wait_timeout: Duration,

    /// Retry-after hint used when `wait_timeout` is zero.
    pub default_retry_after: Duration,

    /// Human-readable message returned to rejected HTTP callers.
    pub busy_message: String,

    /// Capacity of the event bus broadcast channel ring buffer (min 1; clamped).
    pub bus_capacity: usize,
}

impl GateConfig {
    /// Returns the concurrency ceiling clamped to a minimum of 1.
    #[inline]
    pub fn max_concurrent_clamped(&self) -> usize {
        self.max_concurrent.max(1)
    }

    /// Returns the wait timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → waiters are evicted after `d`
    #[inline]
    pub fn wait_timeout_opt(&self) -> Option<Duration> {
        if self.wait_timeout == Duration::ZERO {
            None
        } else {
            Some(self.wait_timeout)
        }
    }

    /// Returns how long a rejected caller ought to wait before retrying.
    ///
    /// `ceil(wait_timeout)` in whole seconds when a timeout is set, otherwise
    /// `default_retry_after` rounded up; never less than one second.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use loadgate::GateConfig;
    ///
    /// let mut cfg = GateConfig::default();
    /// cfg.wait_timeout = Duration::from_millis(1500);
    /// assert_eq!(cfg.retry_after(), Duration::from_secs(2));
    ///
    /// cfg.wait_timeout = Duration::ZERO;
    /// assert_eq!(cfg.retry_after(), Duration::from_secs(5));
    /// ```
    pub fn retry_after(&self) -> Duration {
        let base = self.wait_timeout_opt().unwrap_or(self.default_retry_after);
        Duration::from_secs(ceil_secs(base).max(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Loads limits from the process environment on top of [`GateConfig::default`].
    ///
    /// Unset variables keep their defaults. See the module docs for the keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads limits through an arbitrary key lookup on top of [`GateConfig::default`].
    ///
    /// Values are trimmed; anything outside the accepted range in the module docs
    /// is rejected with [`ConfigError::Invalid`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(n) = parse_key::<_, usize>(&lookup, ENV_MAX_CONCURRENT, 1)? {
            cfg.max_concurrent = n;
        }
        if let Some(n) = parse_key::<_, usize>(&lookup, ENV_MAX_QUEUE_DEPTH, 0)? {
            cfg.max_queue_depth = n;
        }
        if let Some(ms) = parse_key::<_, u64>(&lookup, ENV_WAIT_TIMEOUT_MS, 0)? {
            cfg.wait_timeout = Duration::from_millis(ms);
        }
        Ok(cfg)
    }
}

impl Default for GateConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 20`
    /// - `max_queue_depth = 100`
    /// - `wait_timeout = 15s`
    /// - `default_retry_after = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_concurrent: 20,
            max_queue_depth: 100,
            wait_timeout: Duration::from_millis(15_000),
            default_retry_after: Duration::from_secs(5),
            busy_message: "Server busy. Please try again shortly.".to_string(),
            bus_capacity: 1024,
        }
    }
}

/// Parses `key` as an integer no smaller than `min`; `None` when unset.
fn parse_key<F, T>(lookup: &F, key: &'static str, min: T) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(n) if n >= min => Ok(Some(n)),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_retry_after_rounds_timeout_up() {
        let mut cfg = GateConfig::default();
        cfg.wait_timeout = Duration::from_millis(15_000);
        assert_eq!(cfg.retry_after(), Duration::from_secs(15));

        cfg.wait_timeout = Duration::from_millis(15_001);
        assert_eq!(cfg.retry_after(), Duration::from_secs(16));
    }

    #[test]
    fn test_retry_after_floor_is_one_second() {
        let mut cfg = GateConfig::default();
        cfg.wait_timeout = Duration::from_millis(50);
        assert_eq!(cfg.retry_after(), Duration::from_secs(1));

        cfg.wait_timeout = Duration::ZERO;
        cfg.default_retry_after = Duration::ZERO;
        assert_eq!(cfg.retry_after(), Duration::from_secs(1));
    }

    #[test]
    fn test_clamped_accessors() {
        let cfg = GateConfig {
            max_concurrent: 0,
            bus_capacity: 0,
            wait_timeout: Duration::ZERO,
            ..GateConfig::default()
        };
        assert_eq!(cfg.max_concurrent_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.wait_timeout_opt(), None);
    }

    #[test]
    fn test_from_lookup_defaults_when_unset() {
        let cfg = GateConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.max_concurrent, 20);
        assert_eq!(cfg.max_queue_depth, 100);
        assert_eq!(cfg.wait_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let cfg = GateConfig::from_lookup(lookup(&[
            (ENV_MAX_CONCURRENT, "4"),
            (ENV_MAX_QUEUE_DEPTH, " 0 "),
            (ENV_WAIT_TIMEOUT_MS, "250"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_concurrent, 4);
        assert_eq!(cfg.max_queue_depth, 0);
        assert_eq!(cfg.wait_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_lookup_rejects_zero_concurrency() {
        let err = GateConfig::from_lookup(lookup(&[(ENV_MAX_CONCURRENT, "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: ENV_MAX_CONCURRENT,
                value: "0".into()
            }
        );
    }

    #[test]
    fn test_from_lookup_rejects_out_of_range() {
        let huge = "340282366920938463463374607431768211456";
        let err = GateConfig::from_lookup(lookup(&[(ENV_MAX_QUEUE_DEPTH, huge)])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: ENV_MAX_QUEUE_DEPTH,
                value: huge.into()
            }
        );
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = GateConfig::from_lookup(lookup(&[(ENV_WAIT_TIMEOUT_MS, "-5")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: ENV_WAIT_TIMEOUT_MS,
                value: "-5".into()
            }
        );
    }
}
