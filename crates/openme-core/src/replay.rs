//! Replay protection for decrypted knocks
//!
//! A knock is replayed if its `random_nonce` has been seen before, or if
//! its claimed timestamp has drifted too far from the server's wall
//! clock. Both checks exist because the nonce alone only protects
//! against replaying a *captured* packet within the cache's lifetime;
//! the timestamp bound keeps that lifetime short.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Outcome of a replay check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Knock is fresh and has been recorded
    Accepted,
    /// Knock's nonce was already seen, or its timestamp is outside the window
    Replay,
}

/// Mutex-protected cache of recently seen knock nonces
///
/// The hot path (`check_and_record`) only holds the lock long enough to
/// check and insert a single entry. Pruning runs on a background task so
/// a slow prune never blocks an in-flight knock.
pub struct ReplayCache {
    window: Duration,
    seen: Mutex<HashMap<[u8; 16], Instant>>,
}

impl ReplayCache {
    /// Create a new cache with the given replay window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Check a knock's timestamp and nonce, recording the nonce on success
    ///
    /// `timestamp_ns` is the client's claimed wall-clock time in Unix
    /// nanoseconds, as carried in the knock plaintext.
    pub fn check_and_record(&self, timestamp_ns: i64, nonce: [u8; 16]) -> ReplayOutcome {
        let now_wall_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);

        let age_ns = now_wall_ns.saturating_sub(timestamp_ns).unsigned_abs();
        if age_ns > self.window.as_nanos() as u64 {
            return ReplayOutcome::Replay;
        }

        let mut seen = self.seen.lock();
        if seen.contains_key(&nonce) {
            return ReplayOutcome::Replay;
        }
        seen.insert(nonce, Instant::now());
        ReplayOutcome::Accepted
    }

    /// Remove entries older than the replay window
    ///
    /// Intended to run periodically on a background task, not on the hot
    /// path.
    pub fn prune(&self) {
        let window = self.window;
        let mut seen = self.seen.lock();
        seen.retain(|_, observed_at| observed_at.elapsed() <= window);
    }

    /// Number of nonces currently tracked
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Whether the cache is currently empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a background task that prunes this cache every `window / 2`
    ///
    /// Returns a handle the caller can abort on shutdown.
    pub fn spawn_pruner(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.window / 2;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.prune();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now_ns() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as i64
    }

    #[test]
    fn test_fresh_knock_accepted() {
        let cache = ReplayCache::new(Duration::from_secs(60));
        let outcome = cache.check_and_record(now_ns(), [0x01; 16]);
        assert_eq!(outcome, ReplayOutcome::Accepted);
    }

    #[test]
    fn test_duplicate_nonce_rejected() {
        let cache = ReplayCache::new(Duration::from_secs(60));
        let nonce = [0x02; 16];

        assert_eq!(cache.check_and_record(now_ns(), nonce), ReplayOutcome::Accepted);
        assert_eq!(cache.check_and_record(now_ns(), nonce), ReplayOutcome::Replay);
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let cache = ReplayCache::new(Duration::from_secs(60));
        let stale = now_ns() - Duration::from_secs(120).as_nanos() as i64;

        assert_eq!(cache.check_and_record(stale, [0x03; 16]), ReplayOutcome::Replay);
    }

    #[test]
    fn test_prune_removes_expired_entries() {
        let cache = ReplayCache::new(Duration::from_millis(10));
        cache.check_and_record(now_ns(), [0x04; 16]);
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(20));
        cache.prune();
        assert!(cache.is_empty());
    }
}
