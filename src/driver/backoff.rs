//! # Retry Backoff
//!
//! Fibonacci backoff between attempts of a transient provider call. Grows more
//! slowly than exponential backoff, which suits the small attempt counts used here.
//!
//! ```rust
//! use bucket_driver::driver::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(200, 1000);
//! assert_eq!(backoff.next_backoff_millis(), 200);
//! assert_eq!(backoff.next_backoff_millis(), 200);
//! assert_eq!(backoff.next_backoff_millis(), 400);
//! assert_eq!(backoff.next_backoff_millis(), 600);
//! assert_eq!(backoff.next_backoff_millis(), 1000);
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator in milliseconds, capped at `max_ms`
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev_ms: u64,
    current_ms: u64,
    max_ms: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            prev_ms: 0,
            current_ms: min_ms.min(max_ms),
            max_ms,
        }
    }

    /// Build from the configured start delay and cap
    #[must_use]
    pub fn from_durations(start: Duration, max: Duration) -> Self {
        let as_ms = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Self::new(as_ms(start), as_ms(max))
    }

    /// Current delay in milliseconds; advances the sequence
    pub fn next_backoff_millis(&mut self) -> u64 {
        let result = self.current_ms;
        let next = self.prev_ms.saturating_add(self.current_ms);
        self.prev_ms = self.current_ms;
        self.current_ms = next.min(self.max_ms);
        result
    }

    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_millis())
    }
}
