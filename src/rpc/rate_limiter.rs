use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum spacing between outbound calls on one connection.
///
/// Each `acquire` reserves the next free slot under the lock and only then
/// waits for it, so concurrent callers are handed distinct, ordered slots.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_reservation: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_reservation: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration { self.min_interval }

    /// Waits until the reserved slot and returns its instant.
    pub async fn acquire(&self) -> Instant {
        let slot = {
            let mut last = self.last_reservation.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => (previous + self.min_interval).max(now),
                None => now,
            };
            *last = Some(slot);
            slot
        };

        if slot > Instant::now() {
            #[cfg(feature = "deep-trace")]
            debug!("rate_limiter::waiting_ms::{}", (slot - Instant::now()).as_millis());
            tokio::time::sleep_until(slot).await;
        } else {
            debug!("rate_limiter::slot_free");
        }

        slot
    }
}
