//! Checkout Orders and Session Drafts
//!
//! A [`CheckoutOrder`] is what the checkout form submits. A
//! [`SessionDraft`] is the Stripe-agnostic session request built from it:
//! line items in cents, an optional one-off coupon, redirect URLs and the
//! metadata the webhook later reads back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use checkout_core::{AddOn, CoreError, PriceBreakdown, compute_pricing, validate_add_ons};

use crate::error::Result;

/// Checkout form submission
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOrder {
    pub package_name: String,

    /// Whole AUD
    pub base_price: u64,

    #[serde(default)]
    pub selected_upsells: Vec<AddOn>,

    /// Client's view of the discount window
    #[serde(default)]
    pub has_discount: bool,

    /// Exit-intent offer accepted
    #[serde(default)]
    pub has_recovery_discount: bool,

    pub customer_email: String,
    pub customer_name: String,
    pub phone: String,
    pub business_name: String,

    #[serde(default)]
    pub project_details: Option<String>,

    #[serde(default)]
    pub inspiration_website: Option<String>,
}

impl CheckoutOrder {
    /// Reject orders that cannot be priced or contacted
    pub fn validate(&self) -> Result<()> {
        if self.package_name.trim().is_empty() {
            return Err(CoreError::InvalidInput("package name is required".into()).into());
        }
        if self.customer_name.trim().is_empty() {
            return Err(CoreError::InvalidInput("name is required".into()).into());
        }
        if !is_plausible_email(&self.customer_email) {
            return Err(CoreError::InvalidInput(format!(
                "'{}' is not an email address",
                self.customer_email
            ))
            .into());
        }
        validate_add_ons(&self.selected_upsells)?;
        Ok(())
    }

    pub fn pricing(&self) -> PriceBreakdown {
        compute_pricing(
            self.base_price,
            &self.selected_upsells,
            self.has_discount,
            self.has_recovery_discount,
        )
    }

    /// Add-on names, in selection order
    pub fn upsell_names(&self) -> Vec<String> {
        self.selected_upsells.iter().map(|u| u.name.clone()).collect()
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// One Stripe line item, price in cents
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub unit_amount_cents: i64,
    pub quantity: u64,
}

/// One-off percentage coupon
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponSpec {
    pub percent_off: u8,
    pub name: String,
}

/// Everything needed to open a hosted checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDraft {
    pub line_items: Vec<LineItem>,
    pub coupon: Option<CouponSpec>,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
    pub pricing: PriceBreakdown,
}

impl SessionDraft {
    /// Build the session request for `order`, redirecting back to `base_url`
    pub fn from_order(order: &CheckoutOrder, base_url: &str) -> Result<Self> {
        let pricing = order.pricing();
        let base_url = base_url.trim_end_matches('/');

        let mut line_items = Vec::with_capacity(order.selected_upsells.len() + 1);
        line_items.push(LineItem {
            name: format!("{} Package", order.package_name),
            description: "Professional website development".into(),
            unit_amount_cents: to_cents(order.base_price)?,
            quantity: 1,
        });
        for upsell in &order.selected_upsells {
            line_items.push(LineItem {
                name: upsell.name.clone(),
                description: "Add-on service".into(),
                unit_amount_cents: to_cents(upsell.price)?,
                quantity: 1,
            });
        }

        let coupon = (pricing.tier.is_discounted() && pricing.discount_amount > 0).then(|| {
            let percent_off = pricing.tier.percent_off();
            CouponSpec {
                percent_off,
                name: format!("Limited Time {percent_off}% Off"),
            }
        });

        let mut metadata = BTreeMap::new();
        metadata.insert("customerName".into(), order.customer_name.clone());
        metadata.insert("phone".into(), order.phone.clone());
        metadata.insert("businessName".into(), order.business_name.clone());
        metadata.insert("packageName".into(), order.package_name.clone());
        metadata.insert("basePrice".into(), order.base_price.to_string());
        metadata.insert(
            "projectDetails".into(),
            order.project_details.clone().unwrap_or_default(),
        );
        metadata.insert(
            "inspirationWebsite".into(),
            order.inspiration_website.clone().unwrap_or_default(),
        );
        metadata.insert("hasDiscount".into(), order.has_discount.to_string());
        metadata.insert(
            "hasRecoveryDiscount".into(),
            order.has_recovery_discount.to_string(),
        );
        metadata.insert("upsells".into(), order.upsell_names().join(", "));

        Ok(Self {
            line_items,
            coupon,
            customer_email: order.customer_email.trim().to_string(),
            success_url: format!("{base_url}/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base_url}/cancel"),
            metadata,
            pricing,
        })
    }
}

fn to_cents(price: u64) -> Result<i64> {
    price
        .checked_mul(100)
        .and_then(|cents| i64::try_from(cents).ok())
        .ok_or_else(|| CoreError::InvalidInput(format!("price {price} is out of range")).into())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_order() -> CheckoutOrder {
        CheckoutOrder {
            package_name: "Pro".into(),
            base_price: 1000,
            selected_upsells: vec![
                AddOn::new("logo", "Professional Logo Design", 250),
                AddOn::new("rush", "Rush Delivery", 400),
            ],
            has_discount: true,
            has_recovery_discount: false,
            customer_email: "sarah.j.test@example.com".into(),
            customer_name: "Sarah Johnson".into(),
            phone: "0423456789".into(),
            business_name: "Sarah's Business".into(),
            project_details: None,
            inspiration_website: Some("https://example.com".into()),
        }
    }

    #[test]
    fn test_order_deserializes_from_form_json() {
        let json = serde_json::json!({
            "packageName": "Basic",
            "basePrice": 500,
            "selectedUpsells": [{"id": "seo", "name": "Advanced SEO Package", "price": 300}],
            "hasDiscount": true,
            "customerEmail": "john.smith.test@example.com",
            "customerName": "John Smith",
            "phone": "0412345678",
            "businessName": "John's Business"
        });
        let order: CheckoutOrder = serde_json::from_value(json).unwrap();
        assert!(!order.has_recovery_discount);
        assert_eq!(order.project_details, None);
        assert_eq!(order.pricing().total, 720);
    }

    #[test]
    fn test_negative_price_is_rejected_at_parse() {
        let json = serde_json::json!({
            "packageName": "Basic",
            "basePrice": -500,
            "customerEmail": "a@b.co",
            "customerName": "A",
            "phone": "",
            "businessName": ""
        });
        assert!(serde_json::from_value::<CheckoutOrder>(json).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(sample_order().validate().is_ok());

        let mut order = sample_order();
        order.customer_email = "not-an-email".into();
        assert!(order.validate().is_err());

        let mut order = sample_order();
        order.selected_upsells.push(AddOn::new("logo", "Professional Logo Design", 250));
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_draft_line_items_in_cents() {
        let draft = SessionDraft::from_order(&sample_order(), "https://webdevpro.dev/").unwrap();

        assert_eq!(draft.line_items.len(), 3);
        assert_eq!(draft.line_items[0].name, "Pro Package");
        assert_eq!(draft.line_items[0].unit_amount_cents, 100_000);
        assert_eq!(draft.line_items[1].unit_amount_cents, 25_000);
        assert_eq!(draft.line_items[2].description, "Add-on service");

        assert_eq!(
            draft.success_url,
            "https://webdevpro.dev/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(draft.cancel_url, "https://webdevpro.dev/cancel");
    }

    #[test]
    fn test_draft_coupon_follows_tier() {
        let draft = SessionDraft::from_order(&sample_order(), "http://localhost:3000").unwrap();
        assert_eq!(
            draft.coupon,
            Some(CouponSpec {
                percent_off: 10,
                name: "Limited Time 10% Off".into()
            })
        );
        assert_eq!(draft.pricing.total, 1485);

        let mut order = sample_order();
        order.has_recovery_discount = true;
        let draft = SessionDraft::from_order(&order, "http://localhost:3000").unwrap();
        assert_eq!(draft.coupon.map(|c| c.percent_off), Some(15));

        let mut order = sample_order();
        order.has_discount = false;
        order.has_recovery_discount = true;
        let draft = SessionDraft::from_order(&order, "http://localhost:3000").unwrap();
        assert!(draft.coupon.is_none());
    }

    #[test]
    fn test_draft_metadata() {
        let draft = SessionDraft::from_order(&sample_order(), "http://localhost:3000").unwrap();
        let meta = &draft.metadata;
        assert_eq!(meta["projectDetails"], "");
        assert_eq!(meta["inspirationWebsite"], "https://example.com");
        assert_eq!(meta["hasDiscount"], "true");
        assert_eq!(meta["hasRecoveryDiscount"], "false");
        assert_eq!(meta["basePrice"], "1000");
        assert_eq!(meta["upsells"], "Professional Logo Design, Rush Delivery");
    }
}
