use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{AcquireError, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Caps rows in flight and spaces request starts.
///
/// A worker holds a [`OwnedSemaphorePermit`] for the whole life of a row,
/// retries included, and calls [`RateLimiter::wait_turn`] before every
/// attempt.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    slots: Arc<Semaphore>,
    spacing: Option<Duration>,
    next_start: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    pub fn new(max_in_flight: usize, requests_per_minute: Option<u32>) -> Self {
        let spacing = requests_per_minute
            .filter(|rpm| *rpm > 0)
            .map(|rpm| Duration::from_secs(60) / rpm);

        Self {
            slots: Arc::new(Semaphore::new(max_in_flight.max(1))),
            spacing,
            next_start: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.slots).acquire_owned().await
    }

    /// Waits until this caller may start a request.
    pub async fn wait_turn(&self) {
        let Some(spacing) = self.spacing else {
            return;
        };

        let slot = {
            let mut next = self.next_start.lock().await;
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + spacing;
            slot
        };

        tokio::time::sleep_until(slot).await;
    }

    pub fn spacing(&self) -> Option<Duration> {
        self.spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_from_requests_per_minute() {
        assert_eq!(
            RateLimiter::new(1, Some(120)).spacing(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(RateLimiter::new(1, None).spacing(), None);
        assert_eq!(RateLimiter::new(1, Some(0)).spacing(), None);
    }

    #[tokio::test]
    async fn permits_cap_in_flight() {
        let limiter = RateLimiter::new(2, None);
        let a = limiter.acquire().await.unwrap();
        let _b = limiter.acquire().await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(20), limiter.acquire()).await;
        assert!(blocked.is_err());

        drop(a);
        let freed = tokio::time::timeout(Duration::from_millis(20), limiter.acquire()).await;
        assert!(freed.is_ok());
    }

    #[tokio::test]
    async fn turns_are_spaced() {
        let limiter = RateLimiter::new(4, Some(1200));
        let start = std::time::Instant::now();
        for _ in 0..3 {
            limiter.wait_turn().await;
        }
        // 1200 rpm is one start every 50ms; the first is immediate.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
