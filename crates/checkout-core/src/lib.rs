//! # checkout-core
//!
//! Pricing and visitor-state rules behind the studio site's checkout.
//!
//! ## Components
//!
//! ```text
//! ┌──────────────────┐   active?   ┌──────────────────────┐
//! │ DiscountWindow   │────────────▶│ compute_pricing      │──▶ PriceBreakdown
//! │ (48h from first  │             │ subtotal / discount  │
//! │  visit)          │             │ / total              │
//! └──────────────────┘             └──────────────────────┘
//!
//! ┌──────────────────┐
//! │ RateLimiter      │  fixed window, 5 requests / 60s per identifier
//! └──────────────────┘
//! ```
//!
//! Visitor state (discount start, A/B variant, cookie consent) lives behind
//! the [`KeyValueStore`] trait so callers decide where it is kept.
//!
//! ## Example: Pro package with two add-ons
//!
//! ```text
//! Pro package                1000
//! Professional Logo Design    250
//! Rush Delivery               400
//! ─────────────────────────────────
//! Subtotal                   1650
//! 10% discount               -165
//! Total                      1485 AUD
//! ```

pub mod abtest;
pub mod catalog;
pub mod consent;
pub mod discount;
pub mod error;
pub mod pricing;
pub mod rate_limit;
pub mod store;

pub use abtest::{Variant, VariantAssigner};
pub use catalog::{AddOn, Catalog, Package};
pub use consent::{Consent, ConsentRecord};
pub use discount::{
    Countdown, CountdownTimer, DiscountWindow, Tick, VISITOR_HIGH_WATER_MARK,
    sweep_expired_visitors,
};
pub use error::{CoreError, Result};
pub use pricing::{DiscountTier, PriceBreakdown, compute_pricing, validate_add_ons};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use store::{KeyValueStore, MemoryStore, ScopedStore};
