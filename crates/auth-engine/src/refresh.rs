//! Token refresh timing.

use std::time::Duration;

/// Refresh a session once it is this close to expiring.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(90);

/// Configuration for retry behavior during token refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Maximum number of attempts.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RefreshConfig {
    /// Retry immediately; for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let config = RefreshConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RefreshConfig::default();
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(5000));
        assert_eq!(config.delay_for_attempt(80), Duration::from_millis(5000));
    }

    #[test]
    fn test_immediate_config() {
        let config = RefreshConfig::immediate(2);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.delay_for_attempt(5), Duration::ZERO);
    }
}
