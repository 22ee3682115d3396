//! Rate limiter for preventing brute force attacks on login

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of failed attempts allowed per window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 900,  // 15 minutes
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `LOGIN_MAX_ATTEMPTS` (default: 5)
    /// - `LOGIN_WINDOW_SECONDS` (default: 300)
    /// - `LOGIN_BAN_SECONDS` (default: 900)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("LOGIN_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            window_seconds: std::env::var("LOGIN_WINDOW_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.window_seconds),
            ban_duration_seconds: std::env::var("LOGIN_BAN_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ban_duration_seconds),
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    /// Failed attempts in the current window
    failures: u32,
    window_started: Instant,
    ban_expires: Option<Instant>,
}

/// Per-key failed-attempt counter
///
/// Keys are whatever the caller chooses; login uses the lower-cased login
/// name so an attacker cannot dodge the limit by changing case.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether `key` may attempt a login now
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now()).await
    }

    /// Record a failed attempt for `key`
    pub async fn record_failure(&self, key: &str) {
        self.record_failure_at(key, Instant::now()).await
    }

    /// Forget `key` after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    /// Drop entries with no active ban whose window has passed
    fn prune(&self, entries: &mut HashMap<String, RateLimiterEntry>, now: Instant) {
        let window = self.window();
        entries.retain(|_, entry| {
            let banned = entry.ban_expires.is_some_and(|ban_expires| now < ban_expires);
            banned || now.duration_since(entry.window_started) < window
        });
    }

    async fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().await;
        self.prune(&mut entries, now);
        let Some(entry) = entries.get_mut(key) else {
            return true;
        };

        match entry.ban_expires {
            Some(ban_expires) if now < ban_expires => false,
            Some(_) => {
                info!("Ban lifted for key {}", key);
                entries.remove(key);
                true
            }
            None => true,
        }
    }

    async fn record_failure_at(&self, key: &str, now: Instant) {
        let mut entries = self.entries.lock().await;
        self.prune(&mut entries, now);
        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            failures: 0,
            window_started: now,
            ban_expires: None,
        });

        if now.duration_since(entry.window_started) >= self.window() {
            entry.failures = 0;
            entry.window_started = now;
        }

        entry.failures += 1;

        if entry.failures >= self.config.max_attempts && entry.ban_expires.is_none() {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Banned key {} for {} seconds after {} failed attempts",
                key, self.config.ban_duration_seconds, entry.failures
            );
        }
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }
}
