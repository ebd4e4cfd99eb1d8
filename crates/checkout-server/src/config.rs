//! Server Configuration
//!
//! Everything comes from the environment (`.env` is loaded first).

use chrono::Duration;

use checkout_core::RateLimitConfig;

/// Env var holding the paid-orders sheet script URL
pub const ORDERS_SHEET_VAR: &str = "GOOGLE_SHEETS_ORDERS_URL";

/// Env var holding the leads sheet script URL
pub const LEADS_SHEET_VAR: &str = "GOOGLE_SHEETS_LEADS_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Public site URL for Stripe redirects; falls back to the request origin
    pub public_base_url: Option<String>,

    /// Limits for checkout and lead submissions
    pub rate_limit: RateLimitConfig,

    /// Limits for visitor offer lookups
    pub offer_rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            public_base_url: None,
            rate_limit: RateLimitConfig::default(),
            offer_rate_limit: RateLimitConfig {
                max_requests: 30,
                window: Duration::seconds(60),
            },
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let window_var = std::env::var("RATE_LIMIT_WINDOW_SECS").ok();
        let window = parse_window(window_var.as_deref()).unwrap_or(defaults.rate_limit.window);

        let limit_from = |var: &str, default: u32| {
            std::env::var(var)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            bind_addr,
            public_base_url,
            rate_limit: RateLimitConfig {
                max_requests: limit_from(
                    "RATE_LIMIT_MAX_REQUESTS",
                    defaults.rate_limit.max_requests,
                ),
                window,
            },
            offer_rate_limit: RateLimitConfig {
                max_requests: limit_from(
                    "OFFER_RATE_LIMIT_MAX_REQUESTS",
                    defaults.offer_rate_limit.max_requests,
                ),
                window,
            },
        }
    }

    /// Base URL for redirects: configured URL, else the caller's origin, else localhost
    pub fn redirect_base(&self, origin: Option<&str>) -> String {
        self.public_base_url
            .as_deref()
            .or(origin.filter(|o| !o.trim().is_empty()))
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Positive whole seconds that fit in a `Duration`; anything else is ignored
fn parse_window(raw: Option<&str>) -> Option<Duration> {
    raw?.trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs > 0)
        .and_then(Duration::try_seconds)
}
