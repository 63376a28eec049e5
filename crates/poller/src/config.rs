use std::time::Duration;

use txsync_transactions::TransactionStatus;

/// Delay between cycles when nothing goes wrong.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How long to wait after failed cycles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RetryPolicy {
    /// Always wait the same amount of time.
    Fixed(Duration),

    /// Grow the delay with every consecutive failure.
    Exponential {
        /// Delay after the first failure.
        initial: Duration,

        /// Ceiling for the delay, jitter included.
        max: Duration,

        /// Growth factor per consecutive failure.
        multiplier: f64,

        /// Fraction of the delay (0.0 to 1.0) randomly added on top.
        jitter: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_POLL_INTERVAL)
    }
}

/// Settings of the optional circuit breaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed cycles that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open before a trial cycle is allowed.
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(60),
        }
    }
}

/// What `stop_listening` does to a fetch that is already in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CancellationMode {
    /// Let the fetch finish, then exit without emitting.
    #[default]
    Graceful,

    /// Abort the fetch as soon as the listener is stopped.
    Immediate,
}

/// Configuration of a [`crate::TransactionPoller`].
#[derive(Clone, Debug)]
pub struct PollerConfig {
    /// Cancellation behaviour for in-flight fetches.
    pub cancellation: CancellationMode,

    /// Circuit breaker, disabled when `None`.
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    /// Predicate deciding whether a status can still change.
    pub is_final: fn(&TransactionStatus) -> bool,

    /// Delay between successful cycles.
    pub poll_interval: Duration,

    /// Delay policy after failed cycles.
    pub retry: RetryPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            cancellation: CancellationMode::default(),
            circuit_breaker: None,
            is_final: TransactionStatus::is_final,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}
