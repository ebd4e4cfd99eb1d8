//! Stripe Checkout Integration
//!
//! Opens hosted checkout sessions from a [`SessionDraft`]. When the draft
//! carries a coupon, a one-off percentage coupon is created first and
//! attached to the session.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client, Coupon, CouponDuration,
    CreateCheckoutSession, CreateCheckoutSessionDiscounts, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentMethodTypes, CreateCoupon, Currency,
};

use crate::error::{PaymentError, Result};
use crate::order::{CouponSpec, SessionDraft};

/// A session the customer can be redirected to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    pub url: String,
}

/// Session-creation boundary
#[async_trait]
pub trait SessionCreator: Send + Sync {
    async fn create_session(&self, draft: &SessionDraft) -> Result<CreatedSession>;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    webhook_secret: String,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| PaymentError::Config("STRIPE_WEBHOOK_SECRET not set".into()))?;

        Ok(Self::new(&secret_key, &webhook_secret))
    }

    /// Get the webhook secret
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    async fn create_coupon(&self, spec: &CouponSpec) -> Result<String> {
        let mut params = CreateCoupon::new();
        params.percent_off = Some(f64::from(spec.percent_off));
        params.duration = Some(CouponDuration::Once);
        params.name = Some(&spec.name);

        let coupon = Coupon::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        tracing::debug!(coupon_id = %coupon.id, percent_off = spec.percent_off, "Created coupon");
        Ok(coupon.id.to_string())
    }
}

#[async_trait]
impl SessionCreator for StripeClient {
    async fn create_session(&self, draft: &SessionDraft) -> Result<CreatedSession> {
        let coupon_id = match &draft.coupon {
            Some(spec) => Some(self.create_coupon(spec).await?),
            None => None,
        };

        let mut params = CreateCheckoutSession::new();
        params.customer_email = Some(&draft.customer_email);
        params.success_url = Some(&draft.success_url);
        params.cancel_url = Some(&draft.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);

        let metadata: HashMap<String, String> = draft
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.metadata = Some(metadata);

        params.line_items = Some(
            draft
                .line_items
                .iter()
                .map(|item| CreateCheckoutSessionLineItems {
                    quantity: Some(item.quantity),
                    price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                        currency: Currency::AUD,
                        unit_amount: Some(item.unit_amount_cents),
                        product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                            name: item.name.clone(),
                            description: Some(item.description.clone()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .collect(),
        );

        if let Some(coupon) = coupon_id {
            params.discounts = Some(vec![CreateCheckoutSessionDiscounts {
                coupon: Some(coupon),
                ..Default::default()
            }]);
        }

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        tracing::info!(
            session_id = %session.id,
            total = draft.pricing.total,
            tier = ?draft.pricing.tier,
            "Created checkout session"
        );

        Ok(CreatedSession {
            session_id: session.id.to_string(),
            url,
        })
    }
}
