//! Inter-cycle pacing.
//!
//! Pacing only limits how fast cycles run; the coordinator's results do not
//! depend on it.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Pacing: Send + Sync {
    /// Called after `cycle` finishes and before the next one starts.
    async fn pause(&self, cycle: u32);
}

/// Run cycles back to back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacing for NoDelay {
    async fn pause(&self, _cycle: u32) {}
}

/// Sleep a fixed interval between cycles.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval(pub Duration);

#[async_trait]
impl Pacing for FixedInterval {
    async fn pause(&self, _cycle: u32) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fixed_interval_sleeps() {
        let start = tokio::time::Instant::now();
        FixedInterval(Duration::from_millis(500)).pause(1).await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
