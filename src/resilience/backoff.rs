//! Delays between upsert attempts.

use std::time::Duration;
use rand::Rng;

use crate::config::{BackoffStrategy, RetryConfig};

/// Calculate exponential backoff delay, optionally with jitter.
///
/// `attempt` is the number of attempts already made (1 after the first failure).
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter: bool) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter_ms = if jitter && jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter_ms)
}

/// Delay to wait after `attempt` failed attempts, per the configured strategy.
pub fn delay_for(config: &RetryConfig, attempt: u32) -> Duration {
    match config.backoff {
        BackoffStrategy::Fixed => Duration::from_millis(config.base_delay_ms),
        BackoffStrategy::Exponential => {
            calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms, config.jitter)
        }
    }
}
