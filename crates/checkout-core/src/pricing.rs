//! Order Pricing
//!
//! Subtotal, discount and total for a package plus add-ons.
//!
//! Amounts are whole AUD. Rates and intermediate products use `Decimal` and
//! are rounded half-up to whole units.
//!
//! `discount_amount` and `total` are each rounded from their own product,
//! so `subtotal - discount_amount` can differ from `total` by one unit when
//! the discounted subtotal lands exactly on .5 (e.g. 1650 at 15%:
//! discount 248, total 1403). Both figures are kept as computed.

use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::catalog::AddOn;
use crate::error::{CoreError, Result};

/// Discount tier derived from the window and exit-intent flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountTier {
    /// No promotion
    None,
    /// Time-boxed launch discount (10%)
    Standard,
    /// Standard plus the exit-intent recovery offer (15%)
    Recovery,
}

impl DiscountTier {
    /// Recovery only counts while the window discount is active
    pub const fn from_flags(discount_active: bool, recovery_active: bool) -> Self {
        match (discount_active, recovery_active) {
            (false, _) => DiscountTier::None,
            (true, false) => DiscountTier::Standard,
            (true, true) => DiscountTier::Recovery,
        }
    }

    /// Fraction taken off the subtotal
    pub fn rate(self) -> Decimal {
        match self {
            DiscountTier::None => Decimal::ZERO,
            DiscountTier::Standard => dec!(0.10),
            DiscountTier::Recovery => dec!(0.15),
        }
    }

    /// Whole-number percentage, as Stripe coupons want it
    pub const fn percent_off(self) -> u8 {
        match self {
            DiscountTier::None => 0,
            DiscountTier::Standard => 10,
            DiscountTier::Recovery => 15,
        }
    }

    pub const fn is_discounted(self) -> bool {
        !matches!(self, DiscountTier::None)
    }
}

/// Computed prices for one order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: u64,
    pub discount_rate: Decimal,
    pub discount_amount: u64,
    pub total: u64,
    pub tier: DiscountTier,
}

impl PriceBreakdown {
    /// What the customer saves against the subtotal
    pub const fn savings(&self) -> u64 {
        self.subtotal.saturating_sub(self.total)
    }
}

/// Price an order.
///
/// Total over its domain: unsigned prices cannot be negative, and add-on
/// validity is checked separately by [`validate_add_ons`].
pub fn compute_pricing(
    base_price: u64,
    add_ons: &[AddOn],
    discount_active: bool,
    recovery_discount_active: bool,
) -> PriceBreakdown {
    let subtotal = add_ons
        .iter()
        .fold(base_price, |sum, add_on| sum.saturating_add(add_on.price));

    let tier = DiscountTier::from_flags(discount_active, recovery_discount_active);
    if !tier.is_discounted() {
        return PriceBreakdown {
            subtotal,
            discount_rate: Decimal::ZERO,
            discount_amount: 0,
            total: subtotal,
            tier,
        };
    }

    let rate = tier.rate();
    let amount = Decimal::from(subtotal);

    PriceBreakdown {
        subtotal,
        discount_rate: rate,
        discount_amount: round_half_up(amount * rate),
        total: round_half_up(amount * (Decimal::ONE - rate)),
        tier,
    }
}

/// Reject malformed add-on selections before pricing
pub fn validate_add_ons(add_ons: &[AddOn]) -> Result<()> {
    let mut seen = HashSet::new();

    for add_on in add_ons {
        if add_on.id.trim().is_empty() {
            return Err(CoreError::InvalidInput("add-on id must not be empty".into()));
        }
        if add_on.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(format!(
                "add-on '{}' has no name",
                add_on.id
            )));
        }
        if !seen.insert(add_on.id.as_str()) {
            return Err(CoreError::InvalidInput(format!(
                "add-on '{}' selected more than once",
                add_on.id
            )));
        }
    }

    Ok(())
}

fn round_half_up(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_ons(prices: &[u64]) -> Vec<AddOn> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| AddOn::new(format!("addon-{i}"), format!("Add-on {i}"), price))
            .collect()
    }

    #[test]
    fn test_subtotal_sums_base_and_add_ons() {
        let pricing = compute_pricing(500, &add_ons(&[250, 225, 300]), false, false);
        assert_eq!(pricing.subtotal, 1275);

        let bare = compute_pricing(500, &[], false, false);
        assert_eq!(bare.subtotal, 500);
    }

    #[test]
    fn test_no_discount_ignores_recovery_flag() {
        for recovery in [false, true] {
            let pricing = compute_pricing(1000, &add_ons(&[250]), false, recovery);
            assert_eq!(pricing.tier, DiscountTier::None);
            assert_eq!(pricing.discount_amount, 0);
            assert_eq!(pricing.total, pricing.subtotal);
        }
    }

    #[test]
    fn test_standard_discount() {
        let pricing = compute_pricing(1000, &add_ons(&[250, 400]), true, false);
        assert_eq!(pricing.subtotal, 1650);
        assert_eq!(pricing.discount_rate, dec!(0.10));
        assert_eq!(pricing.discount_amount, 165);
        assert_eq!(pricing.total, 1485);
        assert_eq!(pricing.savings(), 165);
    }

    #[test]
    fn test_recovery_discount_rounds_half_up() {
        let pricing = compute_pricing(1000, &add_ons(&[250, 400]), true, true);
        assert_eq!(pricing.tier, DiscountTier::Recovery);
        assert_eq!(pricing.discount_amount, 248); // 247.5
        assert_eq!(pricing.total, 1403); // 1402.5
        // Rounded independently: the two figures overshoot the subtotal by one
        assert_eq!(pricing.discount_amount + pricing.total, 1651);
    }

    #[test]
    fn test_ten_percent_of_odd_subtotal() {
        // 1225 * 0.10 = 122.5, 1225 * 0.90 = 1102.5
        let pricing = compute_pricing(1000, &add_ons(&[225]), true, false);
        assert_eq!(pricing.discount_amount, 123);
        assert_eq!(pricing.total, 1103);
    }

    #[test]
    fn test_zero_price_order() {
        let pricing = compute_pricing(0, &[], true, true);
        assert_eq!(pricing.subtotal, 0);
        assert_eq!(pricing.discount_amount, 0);
        assert_eq!(pricing.total, 0);
    }

    #[test]
    fn test_tier_percent() {
        assert_eq!(DiscountTier::from_flags(true, false).percent_off(), 10);
        assert_eq!(DiscountTier::from_flags(true, true).percent_off(), 15);
        assert_eq!(DiscountTier::from_flags(false, true).percent_off(), 0);
    }

    #[test]
    fn test_validate_add_ons() {
        assert!(validate_add_ons(&add_ons(&[250, 400])).is_ok());

        let duplicate = vec![
            AddOn::new("logo", "Professional Logo Design", 250),
            AddOn::new("logo", "Professional Logo Design", 250),
        ];
        assert!(matches!(
            validate_add_ons(&duplicate),
            Err(CoreError::InvalidInput(_))
        ));

        let unnamed = vec![AddOn::new("logo", " ", 250)];
        assert!(validate_add_ons(&unnamed).is_err());

        let blank_id = vec![AddOn::new("", "Mystery", 10)];
        assert!(validate_add_ons(&blank_id).is_err());
    }
}
