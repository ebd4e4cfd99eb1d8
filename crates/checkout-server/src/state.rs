//! Application State

use std::sync::Arc;

use checkout_core::{Catalog, MemoryStore, RateLimiter};
use checkout_payments::{LeadSink, SessionCreator};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// What the site sells
    pub catalog: Arc<Catalog>,

    /// Per-client limiter for checkout and lead submissions
    pub rate_limiter: Arc<RateLimiter>,

    /// Per-client limiter for visitor offer lookups
    pub offer_limiter: Arc<RateLimiter>,

    /// Per-visitor discount window and A/B state
    pub visitors: Arc<MemoryStore>,

    /// Session creator (None if Stripe is not configured)
    pub sessions: Option<Arc<dyn SessionCreator>>,

    /// Stripe webhook signing secret (None if Stripe is not configured)
    pub webhook_secret: Option<String>,

    /// Leads sheet
    pub leads: Arc<dyn LeadSink>,

    /// Paid-orders sheet
    pub orders: Arc<dyn LeadSink>,

    pub config: Arc<ServerConfig>,
}
