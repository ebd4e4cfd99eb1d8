//! Sheet Rows
//!
//! Payloads forwarded to the Google Sheets scripts: a lead row when the
//! checkout form is submitted, an order row once Stripe reports payment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use checkout_core::PriceBreakdown;

use crate::order::CheckoutOrder;

/// Row for the leads sheet
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub lead_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub business_name: String,
    pub project_details: String,
    pub inspiration_website: String,
    pub package: String,
    pub base_price: u64,
    pub selected_upsells: Vec<String>,
    pub subtotal: u64,
    pub discount_amount: u64,
    pub total_price: u64,
    pub has_discount: bool,
    pub has_recovery_discount: bool,
    pub timestamp: DateTime<Utc>,
}

impl LeadRecord {
    pub fn from_order(order: &CheckoutOrder, pricing: &PriceBreakdown, now: DateTime<Utc>) -> Self {
        Self {
            lead_id: uuid::Uuid::new_v4().to_string(),
            name: order.customer_name.clone(),
            email: order.customer_email.clone(),
            phone: order.phone.clone(),
            business_name: order.business_name.clone(),
            project_details: order.project_details.clone().unwrap_or_default(),
            inspiration_website: order.inspiration_website.clone().unwrap_or_default(),
            package: order.package_name.clone(),
            base_price: order.base_price,
            selected_upsells: order.upsell_names(),
            subtotal: pricing.subtotal,
            discount_amount: pricing.discount_amount,
            total_price: pricing.total,
            has_discount: pricing.tier.is_discounted(),
            has_recovery_discount: pricing.tier == checkout_core::DiscountTier::Recovery,
            timestamp: now,
        }
    }
}

/// The parts of a completed Stripe checkout session we care about
#[derive(Clone, Debug, Default)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub customer_email: Option<String>,
    pub amount_total_cents: Option<i64>,
    pub metadata: HashMap<String, String>,
}

/// Row for the paid-orders sheet
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub business_name: String,
    pub package: String,
    pub base_price: String,
    pub selected_upsells: Vec<String>,

    /// AUD converted from Stripe's cents; a plain JSON number on the wire
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,

    pub project_details: String,
    pub inspiration_website: String,
    pub has_discount: bool,
    pub has_recovery_discount: bool,
    pub payment_status: String,
    pub stripe_session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl OrderRecord {
    pub fn from_checkout(checkout: &CompletedCheckout, now: DateTime<Utc>) -> Self {
        let meta = |key: &str| checkout.metadata.get(key).cloned().unwrap_or_default();
        let flag = |key: &str| checkout.metadata.get(key).is_some_and(|v| v == "true");

        let upsells = meta("upsells");
        let selected_upsells = if upsells.is_empty() {
            Vec::new()
        } else {
            upsells.split(", ").map(String::from).collect()
        };

        let total_price = checkout
            .amount_total_cents
            .map_or(Decimal::ZERO, |cents| Decimal::new(cents, 2));

        Self {
            name: meta("customerName"),
            email: checkout.customer_email.clone().unwrap_or_default(),
            phone: meta("phone"),
            business_name: meta("businessName"),
            package: meta("packageName"),
            base_price: meta("basePrice"),
            selected_upsells,
            total_price,
            project_details: meta("projectDetails"),
            inspiration_website: meta("inspirationWebsite"),
            has_discount: flag("hasDiscount"),
            has_recovery_discount: flag("hasRecoveryDiscount"),
            payment_status: "PAID".into(),
            stripe_session_id: checkout.session_id.clone(),
            timestamp: now,
        }
    }
}
