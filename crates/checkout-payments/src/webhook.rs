//! Stripe Webhook Handling
//!
//! Verifies Stripe's signature and, on `checkout.session.completed`,
//! forwards the paid order to the orders sheet. Every other event is
//! acknowledged and ignored.

use std::sync::Arc;

use chrono::Utc;
use stripe::{Event, EventObject, EventType, Webhook};

use crate::error::{PaymentError, Result};
use crate::records::{CompletedCheckout, OrderRecord};
use crate::sink::{LeadSink, notify_detached};

/// Parsed webhook event
#[derive(Clone, Debug)]
pub enum WebhookEvent {
    /// Payment captured; the order row that was forwarded
    CheckoutCompleted(Box<OrderRecord>),

    /// Unhandled event type
    Other { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler {
    orders: Arc<dyn LeadSink>,
}

impl WebhookHandler {
    pub fn new(orders: Arc<dyn LeadSink>) -> Self {
        Self { orders }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &str, signature: &str, secret: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, secret)
            .map_err(|e| PaymentError::WebhookSignature(e.to_string()))
    }

    /// Process a verified event
    pub fn handle(&self, event: &Event) -> Result<WebhookEvent> {
        tracing::info!(event_type = ?event.type_, "Processing Stripe webhook");

        match event.type_ {
            EventType::CheckoutSessionCompleted => {
                let EventObject::CheckoutSession(session) = &event.data.object else {
                    return Err(PaymentError::WebhookParse(
                        "Invalid checkout session data".into(),
                    ));
                };

                let completed = CompletedCheckout {
                    session_id: session.id.to_string(),
                    customer_email: session.customer_email.clone(),
                    amount_total_cents: session.amount_total,
                    metadata: session.metadata.clone().unwrap_or_default(),
                };

                Ok(self.checkout_completed(&completed))
            }

            _ => {
                let event_type = format!("{:?}", event.type_);
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookEvent::Other { event_type })
            }
        }
    }

    /// Build the order row and hand it to the orders sink without waiting
    pub fn checkout_completed(&self, completed: &CompletedCheckout) -> WebhookEvent {
        let record = OrderRecord::from_checkout(completed, Utc::now());

        tracing::info!(
            session_id = %record.stripe_session_id,
            email = %record.email,
            package = %record.package,
            total = %record.total_price,
            "Checkout completed"
        );

        notify_detached(self.orders.clone(), &record);
        WebhookEvent::CheckoutCompleted(Box::new(record))
    }
}
