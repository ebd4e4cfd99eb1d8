//! # checkout-payments
//!
//! Stripe checkout and order forwarding for the studio site.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  CheckoutOrder  ┌──────────────┐  SessionDraft  ┌─────────────────┐
//! │ Checkout     │────────────────▶│ server       │───────────────▶│ Stripe Hosted   │
//! │ form         │                 │              │                │ Checkout Page   │
//! └──────────────┘                 └──────┬───────┘                └────────┬────────┘
//!                                         │ LeadRecord                      │ checkout.session.completed
//!                                         ▼                                 ▼
//!                                  ┌──────────────┐                 ┌──────────────┐
//!                                  │ Leads sheet  │                 │ Orders sheet │
//!                                  └──────────────┘                 └──────────────┘
//! ```
//!
//! Sheet deliveries are fire-and-forget; a failing sheet never blocks or
//! fails a checkout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{SessionCreator, SessionDraft, StripeClient};
//!
//! let stripe = StripeClient::new("sk_test_xxx", "whsec_xxx");
//! order.validate()?;
//! let draft = SessionDraft::from_order(&order, "https://webdevpro.dev")?;
//! let session = stripe.create_session(&draft).await?;
//!
//! // Redirect the customer to: session.url
//! ```

mod checkout;
mod error;
mod order;
mod records;
mod sink;
mod webhook;

pub use checkout::{CreatedSession, SessionCreator, StripeClient};
pub use error::{PaymentError, Result};
pub use order::{CheckoutOrder, CouponSpec, LineItem, SessionDraft};
pub use records::{CompletedCheckout, LeadRecord, OrderRecord};
pub use sink::{LeadSink, NullSink, SheetsSink, notify_detached};
pub use webhook::{WebhookEvent, WebhookHandler};
