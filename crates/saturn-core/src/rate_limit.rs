//! In-process fixed-window rate limiter keyed by an arbitrary identifier.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keys beyond this count trigger a sweep of expired windows.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        self.check_at(key, limit, window, Utc::now())
    }

    /// Count one request for `key` at `now`.
    pub fn check_at(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() > PRUNE_THRESHOLD {
            let cutoff = now - window;
            windows.retain(|_, w| w.reset_at >= cutoff);
        }

        match windows.get_mut(key) {
            Some(w) if w.reset_at >= now => {
                w.count = w.count.saturating_add(1);
                if w.count > limit {
                    RateLimitDecision {
                        allowed: false,
                        limit,
                        remaining: 0,
                        reset_at: w.reset_at,
                    }
                } else {
                    RateLimitDecision {
                        allowed: true,
                        limit,
                        remaining: limit - w.count,
                        reset_at: w.reset_at,
                    }
                }
            }
            _ => {
                let reset_at = now + window;
                windows.insert(key.to_string(), Window { count: 1, reset_at });
                RateLimitDecision {
                    allowed: limit > 0,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_at,
                }
            }
        }
    }
}
