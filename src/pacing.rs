use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Interval rate limiter: grants at most one permit per `interval`.
///
/// The first permit is immediate; each later one waits until `interval` has
/// passed since the previous permit was granted.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn ready(&mut self) {
        if let Some(last) = self.last {
            sleep_until(last + self.interval).await;
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_permit_is_immediate() {
        let mut pacer = Pacer::from_millis(500);
        let start = Instant::now();
        pacer.ready().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permits_are_spaced() {
        let mut pacer = Pacer::from_millis(500);
        let start = Instant::now();
        for _ in 0..4 {
            pacer.ready().await;
        }
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_work_does_not_add_delay() {
        let mut pacer = Pacer::from_millis(500);
        pacer.ready().await;
        tokio::time::sleep(Duration::from_millis(800)).await;

        let before = Instant::now();
        pacer.ready().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let mut pacer = Pacer::from_millis(0);
        let start = Instant::now();
        for _ in 0..10 {
            pacer.ready().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
