//! Fixed-Window Rate Limiting
//!
//! Bounds how many requests one identifier (usually a client IP) may make
//! per window. In-memory only: counts are lost on restart.
//!
//! Windows are fixed, not sliding. A client can spend its whole quota just
//! before a window ends and a fresh quota just after, so up to twice the
//! limit can land in a short burst around the boundary.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Entry count above which expired entries are swept
pub const GC_HIGH_WATER_MARK: usize = 10_000;

/// Limiter settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub max_requests: u32,

    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::seconds(60),
        }
    }
}

/// Outcome of one check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct Entry {
    count: u32,
    window_reset_at: DateTime<Utc>,
}

/// Per-identifier fixed-window counter
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Mutex<HashMap<String, Entry>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Utc::now())
    }

    /// Count one request from `identifier` at `now`.
    ///
    /// A request arriving exactly at the reset time opens a new window.
    /// Rejected requests do not add to the count.
    pub fn check_at(&self, identifier: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let limit = self.config.max_requests;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.len() > GC_HIGH_WATER_MARK {
            let before = entries.len();
            entries.retain(|_, entry| entry.window_reset_at >= now);
            tracing::debug!(
                swept = before - entries.len(),
                remaining = entries.len(),
                "Swept expired rate limit entries"
            );
        }

        match entries.get_mut(identifier) {
            Some(entry) if entry.window_reset_at > now => {
                if entry.count >= limit {
                    return RateLimitDecision {
                        allowed: false,
                        limit,
                        remaining: 0,
                        reset_at: entry.window_reset_at,
                    };
                }

                entry.count += 1;
                RateLimitDecision {
                    allowed: true,
                    limit,
                    remaining: limit.saturating_sub(entry.count),
                    reset_at: entry.window_reset_at,
                }
            }
            _ => {
                let window_reset_at = now
                    .checked_add_signed(self.config.window)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                entries.insert(
                    identifier.to_string(),
                    Entry {
                        count: 1,
                        window_reset_at,
                    },
                );
                RateLimitDecision {
                    allowed: limit > 0,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_at: window_reset_at,
                }
            }
        }
    }

    /// Number of identifiers currently tracked
    pub fn tracked(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
