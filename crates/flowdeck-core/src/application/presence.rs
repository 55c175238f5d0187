//! Approximate "who is online" tracking
//!
//! Entries live only in process memory and expire lazily: a stale entry is
//! dropped on the next `ping` or `sweep`, never by a background task. An
//! entry can therefore be reported for up to one timeout after the user left.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Default time after the last ping at which a user stops counting as online
pub const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Process-local map of user id to last-seen instant
pub struct PresenceTracker {
    entries: RwLock<HashMap<String, Instant>>,
    timeout: Duration,
}

impl PresenceTracker {
    /// Create a tracker with the default timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_PRESENCE_TIMEOUT)
    }

    /// Create a tracker with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Configured expiry timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Refresh `user_id` (if given), drop expired entries and return the
    /// number of users still online. The three steps run under one lock.
    pub async fn ping(&self, user_id: Option<&str>) -> usize {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        if let Some(user_id) = user_id {
            entries.insert(user_id.to_string(), now);
        }

        let removed = Self::sweep_locked(&mut entries, now, self.timeout);
        if removed > 0 {
            debug!(removed, "Expired presence entries");
        }

        entries.len()
    }

    /// Drop expired entries, returning how many were removed
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        Self::sweep_locked(&mut entries, Instant::now(), self.timeout)
    }

    /// Number of tracked entries. Does not sweep, so it may include users
    /// whose timeout has passed since the last write.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    fn sweep_locked(entries: &mut HashMap<String, Instant>, now: Instant, timeout: Duration) -> usize {
        let before = entries.len();
        entries.retain(|_, last_seen| now.saturating_duration_since(*last_seen) <= timeout);
        before - entries.len()
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn ping_registers_user() {
        let tracker = PresenceTracker::new();
        assert!(tracker.ping(Some("u1")).await >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_ping_counts_everyone_in_window() {
        let tracker = PresenceTracker::new();
        tracker.ping(Some("a")).await;
        tracker.ping(Some("b")).await;

        assert_eq!(tracker.ping(None).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_user_is_dropped_on_next_ping() {
        let tracker = PresenceTracker::new();
        tracker.ping(Some("u1")).await;

        advance(Duration::from_millis(10_001)).await;

        assert_eq!(tracker.ping(None).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_at_exact_timeout_is_still_online() {
        let tracker = PresenceTracker::new();
        tracker.ping(Some("u1")).await;

        advance(Duration::from_millis(10_000)).await;

        assert_eq!(tracker.ping(None).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_ping_wins() {
        let tracker = PresenceTracker::new();
        tracker.ping(Some("u1")).await;
        advance(Duration::from_millis(6_000)).await;
        tracker.ping(Some("u1")).await;

        // 12s after the first ping, 6s after the second
        advance(Duration::from_millis(6_000)).await;

        assert_eq!(tracker.ping(None).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn count_does_not_sweep() {
        let tracker = PresenceTracker::with_timeout(Duration::from_millis(100));
        tracker.ping(Some("u1")).await;
        advance(Duration::from_millis(500)).await;

        assert_eq!(tracker.count().await, 1);
        assert_eq!(tracker.sweep().await, 1);
        assert_eq!(tracker.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_pings_are_all_recorded() {
        let tracker = Arc::new(PresenceTracker::new());

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.ping(Some(&format!("user-{}", i))).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(tracker.count().await, 20);
    }
}
