//! Idle timeout enforcement.
//!
//! # Responsibilities
//! - Record the last time bytes were forwarded on a connection
//! - Detect when no bytes moved for a full window
//!
//! # Design Decisions
//! - One monotonic timestamp per connection, rearmed with an atomic store
//! - A single ticking watchdog polls it; no timer is created per transfer
//! - Uses Tokio's clock so paused-time tests drive it

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Default idle window for a relaying connection.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on watchdog polling granularity.
const MAX_TICK: Duration = Duration::from_secs(1);

/// A resettable idle timer.
///
/// `touch` rearms the timer; [`IdleTimer::expired`] resolves once the timer
/// has gone a full window without being touched.
#[derive(Debug)]
pub struct IdleTimer {
    epoch: Instant,
    /// Milliseconds since `epoch` of the last activity.
    last_activity_ms: AtomicU64,
    window: Duration,
}

impl IdleTimer {
    /// Create a timer armed from now.
    pub fn new(window: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            window,
        }
    }

    /// Record activity, rearming the full window.
    pub fn touch(&self) {
        let now = millis(self.epoch.elapsed());
        self.last_activity_ms.fetch_max(now, Ordering::Relaxed);
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(last)
    }

    /// Whether a full window has passed without activity.
    pub fn is_expired(&self) -> bool {
        self.idle_for() >= self.window
    }

    /// Resolve once the timer expires. Polls at a fraction of the window.
    pub async fn expired(&self) {
        let mut ticker = tokio::time::interval(self.tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.is_expired() {
                return;
            }
        }
    }

    fn tick(&self) -> Duration {
        (self.window / 4).clamp(Duration::from_millis(1), MAX_TICK)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
