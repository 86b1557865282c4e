//! Per-client request rate limiting

use crate::config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u32,
    window_start: Instant,
    last_seen: Instant,
}

/// Window-based rate limiter keyed by client id.
///
/// Each client gets `limit` requests per window; the window restarts on the
/// first request after it expires. The table never holds more than
/// `max_clients` entries: when a new client arrives at a full table, clients
/// idle for two windows are pruned, and if none are, the least recently
/// seen client is evicted.
#[derive(Debug)]
pub struct RateLimiter {
    clients: Mutex<HashMap<String, ClientWindow>>,
    limit: u32,
    window: Duration,
    max_clients: usize,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration, max_clients: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            limit,
            window,
            max_clients: max_clients.max(1),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.requests_per_window,
            Duration::from_secs(config.window_secs),
            config.max_clients,
        )
    }

    /// Count one request for `client_id`; false if over the limit.
    pub fn allow(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock();

        if !clients.contains_key(client_id) && clients.len() >= self.max_clients {
            self.prune(&mut clients, now);
            while clients.len() >= self.max_clients {
                let Some(oldest) = clients
                    .iter()
                    .min_by_key(|(_, state)| state.last_seen)
                    .map(|(id, _)| id.clone())
                else {
                    break;
                };
                clients.remove(&oldest);
                tracing::debug!(max_clients = self.max_clients, "Evicted least recently seen client");
            }
        }

        let state = clients.entry(client_id.to_string()).or_insert(ClientWindow {
            count: 0,
            window_start: now,
            last_seen: now,
        });
        if now.duration_since(state.window_start) >= self.window {
            state.count = 0;
            state.window_start = now;
        }
        state.last_seen = now;

        if state.count >= self.limit {
            return false;
        }
        state.count += 1;
        true
    }

    /// Requests left in the client's current window.
    pub fn remaining(&self, client_id: &str) -> u32 {
        let now = Instant::now();
        match self.clients.lock().get(client_id) {
            Some(state) if now.duration_since(state.window_start) < self.window => {
                self.limit.saturating_sub(state.count)
            }
            _ => self.limit,
        }
    }

    /// Forget a client's window.
    pub fn reset(&self, client_id: &str) {
        self.clients.lock().remove(client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    fn prune(&self, clients: &mut HashMap<String, ClientWindow>, now: Instant) {
        let idle = self.window * 2;
        let before = clients.len();
        clients.retain(|_, state| now.duration_since(state.last_seen) < idle);
        tracing::debug!(
            pruned = before - clients.len(),
            remaining = clients.len(),
            "Pruned idle rate-limit clients"
        );
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_client() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), 100);
        for _ in 0..3 {
            assert!(limiter.allow("a"));
        }
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
        assert_eq!(limiter.remaining("a"), 0);
        assert_eq!(limiter.remaining("b"), 2);
        assert_eq!(limiter.remaining("unknown"), 3);
    }

    #[test]
    fn test_window_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20), 100);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow("a"));
    }

    #[test]
    fn test_reset() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), 100);
        assert!(limiter.allow("a"));
        limiter.reset("a");
        assert!(limiter.allow("a"));
    }

    #[test]
    fn test_idle_clients_pruned() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10), 2);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("b"));
        std::thread::sleep(Duration::from_millis(25));
        assert!(limiter.allow("c"));
        assert_eq!(limiter.client_count(), 1);
    }

    #[test]
    fn test_least_recently_seen_evicted_at_capacity() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60), 2);
        assert!(limiter.allow("a"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(limiter.allow("b"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(limiter.allow("c"));
        assert_eq!(limiter.client_count(), 2);
        assert_eq!(limiter.remaining("a"), 5);
        assert_eq!(limiter.remaining("b"), 4);
        assert_eq!(limiter.remaining("c"), 4);
    }

    #[test]
    fn test_table_bounded_under_client_churn() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60), 2);
        for i in 0..1000 {
            assert!(limiter.allow(&format!("client-{}", i)));
            assert!(limiter.client_count() <= 2);
        }
    }
}
