//! Connection handler configuration types.

use std::time::Duration;

use crate::types::ConnectionState;

/// Minimum re-evaluation delay for every state.
///
/// Each field is a delay in milliseconds. The table is total over
/// [`ConnectionState`], so a lookup can never miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTable {
    pub init: u32,
    pub connecting: u32,
    pub connected: u32,
    pub disconnecting: u32,
    pub disconnected: u32,
    pub closed: u32,
    pub error: u32,
}

impl IntervalTable {
    /// Get the minimum delay before `state` is evaluated again.
    pub fn get(&self, state: ConnectionState) -> Duration {
        Duration::from_millis(u64::from(self.get_ms(state)))
    }

    /// Get the delay for `state` in milliseconds.
    pub fn get_ms(&self, state: ConnectionState) -> u32 {
        match state {
            ConnectionState::Init => self.init,
            ConnectionState::Connecting => self.connecting,
            ConnectionState::Connected => self.connected,
            ConnectionState::Disconnecting => self.disconnecting,
            ConnectionState::Disconnected => self.disconnected,
            ConnectionState::Closed => self.closed,
            ConnectionState::Error => self.error,
        }
    }

    /// Override the delay for one state.
    pub const fn with(mut self, state: ConnectionState, ms: u32) -> Self {
        match state {
            ConnectionState::Init => self.init = ms,
            ConnectionState::Connecting => self.connecting = ms,
            ConnectionState::Connected => self.connected = ms,
            ConnectionState::Disconnecting => self.disconnecting = ms,
            ConnectionState::Disconnected => self.disconnected = ms,
            ConnectionState::Closed => self.closed = ms,
            ConnectionState::Error => self.error = ms,
        }
        self
    }

    /// A table with the same delay for every state.
    pub const fn uniform(ms: u32) -> Self {
        Self {
            init: ms,
            connecting: ms,
            connected: ms,
            disconnecting: ms,
            disconnected: ms,
            closed: ms,
            error: ms,
        }
    }
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            init: 100,
            connecting: 500,
            connected: 10_000,
            disconnecting: 100,
            disconnected: 1_000,
            closed: 1_000,
            error: 1_000,
        }
    }
}

/// Where a failed transport initialization leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitFailurePolicy {
    /// Go to Disconnected; keep-alive retries bring-up.
    #[default]
    Retry,
    /// Go to Error; only a new connect request restarts bring-up.
    Halt,
}

impl InitFailurePolicy {
    /// State entered after a failed initialization.
    pub fn next_state(&self) -> ConnectionState {
        match self {
            Self::Retry => ConnectionState::Disconnected,
            Self::Halt => ConnectionState::Error,
        }
    }
}

/// Backoff strategy for keep-alive retries.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// Fixed delay between attempts.
    Fixed(Duration),
    /// Exponential backoff with configurable parameters.
    Exponential {
        /// Initial delay.
        base: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier for each attempt.
        multiplier: f64,
    },
    /// Linear backoff with configurable parameters.
    Linear {
        /// Initial delay.
        initial: Duration,
        /// Increment per attempt.
        increment: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(d) => *d,
            BackoffStrategy::Exponential {
                base,
                max,
                multiplier,
            } => {
                let exponent = attempt.min(i32::MAX as u32) as i32;
                let delay_ms = base.as_millis() as f64 * multiplier.powi(exponent);
                Duration::from_millis(delay_ms.min(max.as_millis() as f64) as u64)
            }
            BackoffStrategy::Linear {
                initial,
                increment,
                max,
            } => {
                let delay = increment
                    .checked_mul(attempt)
                    .and_then(|step| initial.checked_add(step))
                    .unwrap_or(*max);
                delay.min(*max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Connection handler configuration.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Per-state re-evaluation delays.
    pub intervals: IntervalTable,
    /// Routing of a failed initialization.
    pub init_failure: InitFailurePolicy,
    /// Stretch the Disconnected dwell while retries keep failing.
    pub backoff: Option<BackoffStrategy>,
    /// Keep-alive intent at construction.
    pub keep_alive: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            intervals: IntervalTable::default(),
            init_failure: InitFailurePolicy::default(),
            backoff: None,
            keep_alive: true,
        }
    }
}

impl HandlerConfig {
    /// Create a configuration around an interval table.
    pub fn new(intervals: IntervalTable) -> Self {
        Self {
            intervals,
            ..Default::default()
        }
    }

    /// Set the interval table.
    pub fn with_intervals(mut self, intervals: IntervalTable) -> Self {
        self.intervals = intervals;
        self
    }

    /// Set the initialization failure policy.
    pub fn with_init_failure(mut self, policy: InitFailurePolicy) -> Self {
        self.init_failure = policy;
        self
    }

    /// Enable retry backoff.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Disable retry backoff.
    pub fn without_backoff(mut self) -> Self {
        self.backoff = None;
        self
    }

    /// Set the initial keep-alive intent.
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Effective delay for `state` given the number of consecutive failed
    /// bring-up attempts.
    pub fn interval_for(&self, state: ConnectionState, failed_attempts: u32) -> Duration {
        let base = self.intervals.get(state);
        match (&self.backoff, state) {
            (Some(backoff), ConnectionState::Disconnected) if failed_attempts > 0 => {
                base.max(backoff.delay_for_attempt(failed_attempts - 1))
            }
            _ => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_table_total() {
        let table = IntervalTable::default();
        for state in ConnectionState::ALL {
            assert!(table.get(state) > Duration::ZERO);
        }
        assert_eq!(table.get(ConnectionState::Connected), Duration::from_secs(10));
        assert_eq!(table.get_ms(ConnectionState::Connecting), 500);
    }

    #[test]
    fn test_interval_table_override() {
        let table = IntervalTable::uniform(5).with(ConnectionState::Connected, 50);
        assert_eq!(table.get_ms(ConnectionState::Init), 5);
        assert_eq!(table.get_ms(ConnectionState::Connected), 50);
    }

    #[test]
    fn test_backoff_fixed() {
        let strategy = BackoffStrategy::Fixed(Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(5), Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_exponential() {
        let strategy = BackoffStrategy::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        };
        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(strategy.delay_for_attempt(10), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_linear() {
        let strategy = BackoffStrategy::Linear {
            initial: Duration::from_millis(100),
            increment: Duration::from_millis(50),
            max: Duration::from_secs(1),
        };
        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(100), Duration::from_secs(1));
    }

    #[test]
    fn test_init_failure_policy() {
        assert_eq!(
            InitFailurePolicy::Retry.next_state(),
            ConnectionState::Disconnected
        );
        assert_eq!(InitFailurePolicy::Halt.next_state(), ConnectionState::Error);
    }

    #[test]
    fn test_interval_for_applies_backoff_to_disconnected_only() {
        let config = HandlerConfig::default().with_backoff(BackoffStrategy::Fixed(
            Duration::from_secs(5),
        ));

        assert_eq!(
            config.interval_for(ConnectionState::Disconnected, 0),
            Duration::from_secs(1)
        );
        assert_eq!(
            config.interval_for(ConnectionState::Disconnected, 2),
            Duration::from_secs(5)
        );
        assert_eq!(
            config.interval_for(ConnectionState::Init, 2),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_handler_config_builder() {
        let config = HandlerConfig::new(IntervalTable::uniform(10))
            .with_init_failure(InitFailurePolicy::Halt)
            .with_keep_alive(false);

        assert_eq!(config.intervals, IntervalTable::uniform(10));
        assert_eq!(config.init_failure, InitFailurePolicy::Halt);
        assert!(!config.keep_alive);
        assert!(config.backoff.is_none());
    }
}
