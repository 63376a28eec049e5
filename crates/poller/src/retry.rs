use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::config::{CircuitBreakerConfig, PollerConfig, RetryPolicy};

impl RetryPolicy {
    /// Delay to wait after `consecutive_failures` failed cycles in a row.
    #[must_use]
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential {
                initial,
                max,
                multiplier,
                jitter,
            } => {
                let exponent = i32::try_from(consecutive_failures.saturating_sub(1))
                    .unwrap_or(i32::MAX);
                let base = initial.as_secs_f64() * multiplier.max(1.0).powi(exponent);
                let base = base.min(max.as_secs_f64());

                let jitter = if jitter.is_finite() {
                    jitter.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let extra = if jitter > 0.0 {
                    base * rand::thread_rng().gen_range(0.0..=jitter)
                } else {
                    0.0
                };

                Duration::try_from_secs_f64((base + extra).min(max.as_secs_f64())).unwrap_or(max)
            }
        }
    }
}

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    /// Cycles run normally.
    Closed,

    /// Too many failures; waiting out the open period.
    Open,

    /// The next cycle is a trial.
    HalfOpen,
}

/// Tracks consecutive failures of a listening session and decides how long
/// to sleep after each cycle.
#[derive(Debug)]
pub(crate) struct RetryState {
    breaker: Option<CircuitBreakerConfig>,
    circuit: CircuitState,
    consecutive_failures: u32,
    poll_interval: Duration,
    policy: RetryPolicy,
}

impl RetryState {
    pub(crate) const fn new(config: &PollerConfig) -> Self {
        Self {
            breaker: config.circuit_breaker,
            circuit: CircuitState::Closed,
            consecutive_failures: 0,
            poll_interval: config.poll_interval,
            policy: config.retry,
        }
    }

    pub(crate) const fn circuit(&self) -> CircuitState {
        self.circuit
    }

    /// Called before every cycle. An open circuit whose wait is over lets
    /// one trial cycle through.
    pub(crate) fn before_cycle(&mut self) {
        if self.circuit == CircuitState::Open {
            info!("transaction circuit half-open, probing backend");
            self.circuit = CircuitState::HalfOpen;
        }
    }

    /// Records a successful cycle and returns the delay before the next one.
    pub(crate) fn on_success(&mut self) -> Duration {
        if self.circuit != CircuitState::Closed {
            info!("transaction circuit closed");
        }

        self.circuit = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.poll_interval
    }

    /// Records a failed cycle and returns the delay before the next one.
    pub(crate) fn on_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if let Some(breaker) = self.breaker {
            if self.circuit == CircuitState::HalfOpen
                || self.consecutive_failures >= breaker.failure_threshold.max(1)
            {
                if self.circuit != CircuitState::Open {
                    warn!(
                        failures = self.consecutive_failures,
                        "transaction circuit opened for {:?}", breaker.open_duration
                    );
                }

                self.circuit = CircuitState::Open;
                return breaker.open_duration;
            }
        }

        self.policy.delay(self.consecutive_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(jitter: f64) -> RetryPolicy {
        RetryPolicy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter,
        }
    }

    #[test]
    fn test_fixed_delay_ignores_failures() {
        let policy = RetryPolicy::Fixed(Duration::from_secs(10));

        assert_eq!(policy.delay(1), Duration::from_secs(10));
        assert_eq!(policy.delay(50), Duration::from_secs(10));
    }

    #[test]
    fn test_exponential_delay_grows_and_caps() {
        let policy = exponential(0.0);

        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(5), Duration::from_secs(16));
        assert_eq!(policy.delay(6), Duration::from_secs(30));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = exponential(0.5);

        for _ in 0..100 {
            let delay = policy.delay(3);
            assert!(delay >= Duration::from_secs(4), "{delay:?}");
            assert!(delay <= Duration::from_secs(6), "{delay:?}");
        }

        for _ in 0..100 {
            assert!(policy.delay(10) <= Duration::from_secs(30));
        }
    }

    #[test]
    fn test_success_resets_backoff() {
        let config = PollerConfig {
            poll_interval: Duration::from_secs(10),
            retry: exponential(0.0),
            ..PollerConfig::default()
        };
        let mut state = RetryState::new(&config);

        assert_eq!(state.on_failure(), Duration::from_secs(1));
        assert_eq!(state.on_failure(), Duration::from_secs(2));
        assert_eq!(state.on_success(), Duration::from_secs(10));
        assert_eq!(state.on_failure(), Duration::from_secs(1));
    }

    #[test]
    fn test_circuit_opens_retries_and_closes() {
        let config = PollerConfig {
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 2,
                open_duration: Duration::from_secs(60),
            }),
            retry: RetryPolicy::Fixed(Duration::from_secs(5)),
            ..PollerConfig::default()
        };
        let mut state = RetryState::new(&config);

        assert_eq!(state.on_failure(), Duration::from_secs(5));
        assert_eq!(state.circuit(), CircuitState::Closed);

        assert_eq!(state.on_failure(), Duration::from_secs(60));
        assert_eq!(state.circuit(), CircuitState::Open);

        state.before_cycle();
        assert_eq!(state.circuit(), CircuitState::HalfOpen);

        // A failed trial re-opens straight away.
        assert_eq!(state.on_failure(), Duration::from_secs(60));
        assert_eq!(state.circuit(), CircuitState::Open);

        state.before_cycle();
        state.on_success();
        assert_eq!(state.circuit(), CircuitState::Closed);

        // The failure count starts over once closed.
        assert_eq!(state.on_failure(), Duration::from_secs(5));
        assert_eq!(state.circuit(), CircuitState::Closed);
    }

    #[test]
    fn test_before_cycle_leaves_closed_circuit_alone() {
        let mut state = RetryState::new(&PollerConfig::default());

        state.before_cycle();

        assert_eq!(state.circuit(), CircuitState::Closed);
    }
}
