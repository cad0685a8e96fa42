//! crates/teeforge_core/src/pacing.rs
//!
//! Request pacing policies, decoupled from the business logic that uses
//! them. The sequential product-creation loop uses a fixed interval; the
//! variant-fetch path uses a bounded exponential backoff. Both execute
//! their pauses through the [`Sleeper`] port.

use crate::ports::{PortResult, Sleeper};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A fixed pause between sequential upstream calls, used to stay under the
/// fulfillment platform's rate limits. No jitter.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    pub delay: Duration,
}

impl FixedInterval {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Pauses between loop iterations; call after every iteration except
    /// the last.
    pub async fn pause(&self, sleeper: &dyn Sleeper) {
        sleeper.sleep(self.delay).await;
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

/// A bounded exponential backoff schedule: `max_attempts` tries total,
/// with a pause of `base * factor^i` before retry `i + 1`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub factor: u32,
    pub max_attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, factor: u32, max_attempts: u32) -> Self {
        Self {
            base,
            factor,
            max_attempts,
        }
    }

    /// The pauses between attempts: one fewer than the attempt count.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(move |i| self.base * self.factor.pow(i))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 2, 4)
    }
}

/// Runs `op` until it succeeds or the backoff schedule is exhausted,
/// surfacing the final error unchanged.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: ExponentialBackoff,
    sleeper: &dyn Sleeper,
    label: &str,
    mut op: F,
) -> PortResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<T>>,
{
    let mut delays = policy.delays();
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match delays.next() {
                Some(delay) => {
                    warn!("{label} failed ({err}), retrying in {delay:?}");
                    sleeper.sleep(delay).await;
                }
                None => return Err(err),
            },
        }
    }
}
