//! Per-client sliding-window limiter for intake submissions.
//!
//! The client map is bounded: when it is full, clients with no hit inside the
//! window are dropped first, then the least recently seen client.

use dashmap::DashMap;
use tracing::debug;

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

#[derive(Debug, Default)]
struct ClientWindow {
    /// Hit times in seconds since the epoch, oldest first
    hits: Vec<u64>,
    last_seen: u64,
}

/// Sliding-window limiter keyed by client address.
pub struct IntakeRateLimiter {
    clients: DashMap<String, ClientWindow>,
    window_secs: u64,
    max_requests: u32,
    max_clients: usize,
}

impl IntakeRateLimiter {
    pub fn new(window_secs: u64, max_requests: u32, max_clients: usize) -> Self {
        Self {
            clients: DashMap::new(),
            window_secs: window_secs.max(1),
            max_requests: max_requests.max(1),
            max_clients: max_clients.max(1),
        }
    }

    /// Check `client` against the limit and record the hit if allowed.
    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, now_secs())
    }

    /// [`check`](Self::check) at an explicit time.
    pub fn check_at(&self, client: &str, now: u64) -> RateDecision {
        let cutoff = now.saturating_sub(self.window_secs);

        if !self.clients.contains_key(client) && self.clients.len() >= self.max_clients {
            self.evict(cutoff);
        }

        let mut entry = self.clients.entry(client.to_string()).or_default();
        entry.hits.retain(|&ts| ts > cutoff);
        entry.last_seen = now;

        if entry.hits.len() >= self.max_requests as usize {
            let oldest = entry.hits.first().copied().unwrap_or(now);
            let retry_after_secs = (oldest + self.window_secs).saturating_sub(now).max(1);
            return RateDecision::Limited { retry_after_secs };
        }

        entry.hits.push(now);
        RateDecision::Allowed
    }

    /// Drop clients with no hit inside the window ending at `now`.
    pub fn cleanup_at(&self, now: u64) {
        let cutoff = now.saturating_sub(self.window_secs);
        self.clients.retain(|_, window| window.hits.iter().any(|&ts| ts > cutoff));
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn evict(&self, cutoff: u64) {
        self.clients.retain(|_, window| window.hits.iter().any(|&ts| ts > cutoff));
        if self.clients.len() < self.max_clients {
            return;
        }

        let oldest = self
            .clients
            .iter()
            .min_by_key(|entry| entry.value().last_seen)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            debug!(client = %key, "Evicting least recently seen intake client");
            self.clients.remove(&key);
        }
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_within_window() {
        let limiter = IntakeRateLimiter::new(60, 2, 100);

        assert_eq!(limiter.check_at("10.0.0.1", 1_000), RateDecision::Allowed);
        assert_eq!(limiter.check_at("10.0.0.1", 1_010), RateDecision::Allowed);
        assert_eq!(
            limiter.check_at("10.0.0.1", 1_020),
            RateDecision::Limited { retry_after_secs: 40 }
        );

        // other clients are independent
        assert_eq!(limiter.check_at("10.0.0.2", 1_020), RateDecision::Allowed);
    }

    #[test]
    fn test_window_slides() {
        let limiter = IntakeRateLimiter::new(60, 1, 100);

        assert_eq!(limiter.check_at("a", 1_000), RateDecision::Allowed);
        assert!(matches!(limiter.check_at("a", 1_059), RateDecision::Limited { .. }));
        assert_eq!(limiter.check_at("a", 1_061), RateDecision::Allowed);
    }

    #[test]
    fn test_map_is_bounded() {
        let limiter = IntakeRateLimiter::new(60, 5, 2);

        limiter.check_at("a", 1_000);
        limiter.check_at("b", 1_010);
        limiter.check_at("c", 1_020);
        assert_eq!(limiter.len(), 2);

        // "a" was least recently seen
        assert_eq!(limiter.check_at("b", 1_021), RateDecision::Allowed);
        assert!(limiter.clients.get("a").is_none());
    }

    #[test]
    fn test_stale_clients_evicted_first() {
        let limiter = IntakeRateLimiter::new(60, 5, 2);

        limiter.check_at("stale", 1_000);
        limiter.check_at("fresh", 1_100);
        limiter.check_at("new", 1_110);

        assert!(limiter.clients.get("stale").is_none());
        assert!(limiter.clients.get("fresh").is_some());
        assert!(limiter.clients.get("new").is_some());
    }

    #[test]
    fn test_cleanup_drops_idle_clients() {
        let limiter = IntakeRateLimiter::new(60, 5, 10);
        limiter.check_at("a", 1_000);
        limiter.check_at("b", 1_050);

        limiter.cleanup_at(1_100);
        assert_eq!(limiter.len(), 1);
        assert!(!limiter.is_empty());
    }
}
