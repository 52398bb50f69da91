use std::time::Duration;

/// Fixed interval inserted between consecutive reaction-apply calls.
///
/// Throughput limiting only, not a concurrency primitive: the single actor
/// driving the dispatch loop suspends here and no other event interleaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacer {
    interval: Duration,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::from_millis(200)
    }
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspends for one interval. A zero interval returns immediately.
    pub async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}
