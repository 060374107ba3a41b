//! Platform-agnostic reconnect policy for the transport client.
//!
//! Kept free of runtime dependencies: the client owns the timer, this type only
//! does the retry bookkeeping and delay math.

use std::time::Duration;

/// Linear backoff state.
///
/// The n-th consecutive retry waits `n * base_delay`. The counter only resets
/// when a connection actually opens.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_retries: u32,
    base_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_retries,
            base_delay,
        }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_retries
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None`
    /// once the retry ceiling is reached.
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.base_delay.saturating_mul(self.attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_linearly_until_exhausted() {
        let mut policy = ReconnectPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.next_delay_and_advance(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay_and_advance(), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay_and_advance(), Some(Duration::from_millis(300)));
        assert_eq!(policy.next_delay_and_advance(), None);
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn reset_restarts_from_base_delay() {
        let mut policy = ReconnectPolicy::new(5, Duration::from_millis(1_000));
        policy.next_delay_and_advance();
        policy.next_delay_and_advance();
        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay_and_advance(), Some(Duration::from_millis(1_000)));
    }

    #[test]
    fn zero_retries_never_reconnects() {
        let mut policy = ReconnectPolicy::new(0, Duration::from_millis(10));
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_delay_and_advance(), None);
    }
}
