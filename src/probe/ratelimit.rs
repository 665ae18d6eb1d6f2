use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket holding up to `rate` tokens, refilled at `rate` per second.
/// One token is taken before every outbound probe request.
pub struct RateLimiter {
    rate: f64,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    capacity: f64,
    last: Instant,
}

impl Bucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self { tokens: capacity, capacity, last: now }
    }

    /// Take a token, or report how long until one is available.
    fn try_take(&mut self, now: Instant, rate: f64) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(self.capacity);
        self.last = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / rate))
        }
    }
}

impl RateLimiter {
    /// `None` when `rate_per_sec` is zero, meaning unlimited.
    pub fn new(rate_per_sec: u32) -> Option<Self> {
        if rate_per_sec == 0 {
            return None;
        }
        let rate = f64::from(rate_per_sec);
        Some(Self {
            rate,
            bucket: Mutex::new(Bucket::new(rate, Instant::now())),
        })
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                match bucket.try_take(Instant::now(), self.rate) {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_disables_gate() {
        assert!(RateLimiter::new(0).is_none());
        assert!(RateLimiter::new(5).is_some());
    }

    #[test]
    fn test_bucket_allows_burst_up_to_capacity() {
        let start = Instant::now();
        let mut bucket = Bucket::new(3.0, start);
        assert!(bucket.try_take(start, 3.0).is_ok());
        assert!(bucket.try_take(start, 3.0).is_ok());
        assert!(bucket.try_take(start, 3.0).is_ok());
        let wait = bucket.try_take(start, 3.0).unwrap_err();
        // One token at 3/s takes a third of a second.
        assert!((wait.as_secs_f64() - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let start = Instant::now();
        let mut bucket = Bucket::new(2.0, start);
        bucket.try_take(start, 2.0).unwrap();
        bucket.try_take(start, 2.0).unwrap();
        assert!(bucket.try_take(start, 2.0).is_err());

        let later = start + Duration::from_millis(500);
        assert!(bucket.try_take(later, 2.0).is_ok());
        assert!(bucket.try_take(later, 2.0).is_err());
    }

    #[test]
    fn test_bucket_never_exceeds_capacity() {
        let start = Instant::now();
        let mut bucket = Bucket::new(2.0, start);
        let much_later = start + Duration::from_secs(60);
        bucket.try_take(much_later, 2.0).unwrap();
        bucket.try_take(much_later, 2.0).unwrap();
        assert!(bucket.try_take(much_later, 2.0).is_err());
    }

    #[tokio::test]
    async fn test_acquire_within_capacity_does_not_block() {
        let limiter = RateLimiter::new(100).unwrap();
        let started = std::time::Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
