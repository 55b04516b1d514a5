//! Waiting for a successful transaction's state to become queryable.
//!
//! `Fixed` sleeps once and assumes the state is visible. `Confirm` re-checks
//! with exponential backoff and jitter, up to a bounded number of attempts.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleStrategy {
    Fixed(Duration),
    Confirm {
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::Fixed(Duration::from_secs(2))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The fixed delay elapsed; nothing was verified.
    Elapsed,
    Confirmed { attempts: u32 },
    Unconfirmed { attempts: u32 },
}

impl SettleStrategy {
    /// Wait according to the strategy. `check` is only called by `Confirm`.
    pub async fn settle<F, Fut>(&self, mut check: F) -> SettleOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        match self {
            SettleStrategy::Fixed(delay) => {
                tokio::time::sleep(*delay).await;
                SettleOutcome::Elapsed
            }
            SettleStrategy::Confirm {
                max_attempts,
                base_delay,
                max_delay,
            } => {
                for attempt in 1..=*max_attempts {
                    let delay = calculate_backoff(
                        attempt,
                        base_delay.as_millis() as u64,
                        max_delay.as_millis() as u64,
                    );
                    tokio::time::sleep(delay).await;

                    if check().await {
                        return SettleOutcome::Confirmed { attempts: attempt };
                    }
                    tracing::debug!(attempt = attempt, max_attempts = max_attempts, "State not yet visible");
                }
                SettleOutcome::Unconfirmed {
                    attempts: *max_attempts,
                }
            }
        }
    }
}

/// Exponential backoff delay with up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
    let capped = delay_ms.min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
        assert!(calculate_backoff(1, 100, 2000).as_millis() >= 100);
        assert!(calculate_backoff(2, 100, 2000).as_millis() >= 200);

        let capped = calculate_backoff(10, 100, 1000).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[tokio::test]
    async fn test_fixed_never_checks() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let outcome = SettleStrategy::Fixed(Duration::from_millis(5))
            .settle(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
            .await;
        assert_eq!(outcome, SettleOutcome::Elapsed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirm_stops_on_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let strategy = SettleStrategy::Confirm {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        };
        let outcome = strategy
            .settle(move || async move { calls.fetch_add(1, Ordering::SeqCst) + 1 >= 3 })
            .await;
        assert_eq!(outcome, SettleOutcome::Confirmed { attempts: 3 });
    }

    #[tokio::test]
    async fn test_confirm_gives_up_after_max_attempts() {
        let strategy = SettleStrategy::Confirm {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let outcome = strategy.settle(|| async { false }).await;
        assert_eq!(outcome, SettleOutcome::Unconfirmed { attempts: 2 });
    }
}
