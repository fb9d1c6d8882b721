// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for the contact endpoint.
//!
//! Each client key (the caller's IP as a string) owns a list of request
//! instants. A request is accepted while fewer than `max_requests` of them
//! fall inside the trailing window. Expired instants are pruned on every
//! check of the same key and by a periodic sweep over all keys, which also
//! drops keys with nothing left.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Thread-safe sliding-window rate limiter.
pub struct RateLimiter {
    /// Maximum accepted requests per key inside one window
    limit: usize,
    /// Trailing window length
    window: Duration,
    /// Per-key request instants, oldest first
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_policy(config.max_requests, config.window_duration())
    }

    /// Create a limiter accepting `limit` requests per `window` per key.
    pub fn with_policy(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Check and record a request for `key`.
    ///
    /// Returns `true` and records the current instant when fewer than
    /// `limit` requests were seen inside the window; otherwise stores the
    /// pruned list and returns `false` without recording anything.
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.lock().await;

        let mut valid = requests
            .remove(key)
            .map(|times| self.prune(times, now))
            .unwrap_or_default();

        let allowed = valid.len() < self.limit;
        if allowed {
            valid.push(now);
        } else {
            debug!(key, count = valid.len(), limit = self.limit, "Rate limit exceeded");
        }

        requests.insert(key.to_string(), valid);
        allowed
    }

    /// Prune expired instants for every key and drop empty keys.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.lock().await;
        let before = requests.len();

        requests.retain(|_, times| {
            times.retain(|t| now.saturating_duration_since(*t) < self.window);
            !times.is_empty()
        });

        debug!(before, after = requests.len(), "Rate limiter sweep");
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Run [`cleanup`](Self::cleanup) every `interval` on a background task.
    pub fn spawn_cleanup(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.cleanup().await;
            }
        })
    }

    fn prune(&self, mut times: Vec<Instant>, now: Instant) -> Vec<Instant> {
        times.retain(|t| now.saturating_duration_since(*t) < self.window);
        times
    }
}
