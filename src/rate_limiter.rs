//! Request rate limiting with fixed-interval permits
//!
//! The RateLimiter bounds outbound calls across every concurrent archival task
//! using a lock-free "next permit" timestamp.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Rate limiter shared by all tasks of an archivist
///
/// Permits are issued one per interval, in the order callers reserve them.
/// A caller that arrives after the limiter has been idle gets a permit
/// immediately, but idle time never accumulates into a burst: at most one
/// permit is ever available without waiting.
///
/// # Implementation
///
/// - `interval_nanos`: Spacing between permits (0 = unlimited)
/// - `next_permit`: Earliest time the next permit may be issued
///   (nanoseconds since an arbitrary process-wide epoch)
///
/// A caller reserves its slot with a compare-and-swap on `next_permit` and
/// then sleeps until that slot without holding any lock.
#[derive(Clone)]
pub struct RateLimiter {
    interval_nanos: Arc<AtomicU64>,
    next_permit: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Create a limiter issuing `per_second` permits per second (0 = unlimited)
    ///
    /// # Examples
    ///
    /// ```
    /// use flickr_archive::rate_limiter::RateLimiter;
    ///
    /// // 10 requests per second
    /// let limiter = RateLimiter::new(10);
    /// assert_eq!(limiter.rate(), Some(10));
    ///
    /// // Unlimited
    /// let unlimited = RateLimiter::new(0);
    /// assert_eq!(unlimited.rate(), None);
    /// ```
    #[must_use]
    pub fn new(per_second: u32) -> Self {
        Self {
            interval_nanos: Arc::new(AtomicU64::new(Self::interval_for(per_second))),
            next_permit: Arc::new(AtomicU64::new(Self::now_nanos())),
        }
    }

    /// A limiter that never waits
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Change the permit rate (0 = unlimited)
    ///
    /// Slots already reserved by waiting callers are kept; the new spacing
    /// applies to reservations made afterwards.
    pub fn set_rate(&self, per_second: u32) {
        self.interval_nanos
            .store(Self::interval_for(per_second), Ordering::SeqCst);
    }

    /// Current rate in permits per second, None if unlimited
    pub fn rate(&self) -> Option<u32> {
        let interval = self.interval_nanos.load(Ordering::Relaxed);
        if interval == 0 {
            None
        } else {
            Some((NANOS_PER_SEC / interval) as u32)
        }
    }

    /// Wait for the next permit
    ///
    /// Never fails; only delays.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flickr_archive::rate_limiter::RateLimiter;
    ///
    /// # async fn example() {
    /// let limiter = RateLimiter::new(10);
    ///
    /// // Before every remote call
    /// limiter.acquire().await;
    /// // ... perform request ...
    /// # }
    /// ```
    pub async fn acquire(&self) {
        loop {
            let interval = self.interval_nanos.load(Ordering::Relaxed);
            if interval == 0 {
                return;
            }

            let now = Self::now_nanos();
            let next = self.next_permit.load(Ordering::SeqCst);
            let slot = next.max(now);

            if self
                .next_permit
                .compare_exchange(next, slot + interval, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                if slot > now {
                    tokio::time::sleep(Duration::from_nanos(slot - now)).await;
                }
                return;
            }
            // Another caller reserved the slot first; retry with the new value
        }
    }

    fn interval_for(per_second: u32) -> u64 {
        if per_second == 0 {
            0
        } else {
            NANOS_PER_SEC / u64::from(per_second)
        }
    }

    /// Monotonic time in nanoseconds since an arbitrary process-wide epoch
    fn now_nanos() -> u64 {
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_nanos() as u64
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate())
            .finish()
    }
}
