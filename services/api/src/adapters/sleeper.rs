//! services/api/src/adapters/sleeper.rs
//!
//! The runtime implementation of the `Sleeper` port.

use async_trait::async_trait;
use std::time::Duration;
use teeforge_core::ports::Sleeper;

/// Pauses on the tokio timer.
#[derive(Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
