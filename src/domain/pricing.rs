//! Order Pricing & Shipping Policy

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::promo::PromoCodeResolver;
use crate::{CommerceError, Result};

/// Pricing tier of the shopper, resolved from session state by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerClass {
    Retail,
    Reseller,
}

impl CustomerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Reseller => "reseller",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "retail" => Some(Self::Retail),
            "reseller" => Some(Self::Reseller),
            _ => None,
        }
    }
}

/// One cart entry. Reseller pricing is optional per product; lines without it
/// charge the retail price to every class.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: String,
    pub unit_price_retail: Decimal,
    pub unit_price_reseller: Option<Decimal>,
    pub quantity: u32,
}

impl CartLine {
    pub fn unit_price(&self, class: CustomerClass) -> Decimal {
        match (class, self.unit_price_reseller) {
            (CustomerClass::Reseller, Some(price)) => price,
            _ => self.unit_price_retail,
        }
    }

    pub fn line_total(&self, class: CustomerClass) -> Decimal {
        self.unit_price(class) * Decimal::from(self.quantity)
    }
}

/// Per-class shipping configuration, edited through the admin settings form.
/// A threshold or min-items value of zero leaves that free-shipping branch off.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingRule {
    pub id: Uuid,
    pub customer_class: CustomerClass,
    pub base_price: Decimal,
    pub free_shipping_threshold: Decimal,
    pub free_shipping_min_items: u32,
    pub enabled: bool,
}

/// Flat-fee policy used when no enabled rule exists for a class: the fee is
/// waived only once the subtotal reaches `free_threshold`. Never computed as
/// a silent zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallbackShipping {
    pub flat_fee: Decimal,
    pub free_threshold: Decimal,
}

impl Default for FallbackShipping {
    fn default() -> Self {
        Self { flat_fee: Decimal::new(50, 0), free_threshold: Decimal::new(750, 0) }
    }
}

/// Computed checkout totals. `total == subtotal - discount + shipping_cost`
/// and `shipping_cost` is either zero or the applicable base fee.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

/// The one place order totals are computed, shared by the cart, checkout and
/// admin order surfaces.
#[derive(Clone, Debug, Default)]
pub struct PricingPolicy {
    promo: PromoCodeResolver,
    fallback: FallbackShipping,
}

impl PricingPolicy {
    pub fn new(promo: PromoCodeResolver, fallback: FallbackShipping) -> Self {
        Self { promo, fallback }
    }

    pub fn promo(&self) -> &PromoCodeResolver {
        &self.promo
    }

    /// Computes totals for a cart snapshot. Pure: no side effects, safe to
    /// call concurrently from any request.
    ///
    /// `rule` is the single enabled rule for the class, or `None` when the
    /// caller has confirmed no rule is configured (which selects the fallback
    /// policy; a failed rule fetch must be surfaced by the caller instead).
    pub fn quote(
        &self,
        lines: &[CartLine],
        class: CustomerClass,
        rule: Option<&ShippingRule>,
        promo_code: Option<&str>,
    ) -> Result<OrderTotals> {
        for line in lines {
            if line.quantity < 1 {
                return Err(CommerceError::InvalidQuantity {
                    item_id: line.item_id.clone(),
                    quantity: line.quantity,
                });
            }
        }

        let subtotal: Decimal = lines.iter().map(|l| l.line_total(class)).sum();
        let rate = self.promo.resolve(promo_code);
        // The discount applies to the subtotal only, never to shipping, and
        // can never push the total negative.
        let discount = (subtotal * rate).min(subtotal).max(Decimal::ZERO);
        let item_count: u64 = lines.iter().map(|l| u64::from(l.quantity)).sum();
        let shipping_cost = self.shipping_cost(subtotal, item_count, rule);
        let total = subtotal - discount + shipping_cost;

        Ok(OrderTotals { subtotal, discount, shipping_cost, total })
    }

    fn shipping_cost(&self, subtotal: Decimal, item_count: u64, rule: Option<&ShippingRule>) -> Decimal {
        match rule {
            Some(rule) if rule.enabled => {
                if rule.free_shipping_threshold > Decimal::ZERO
                    && subtotal >= rule.free_shipping_threshold
                {
                    Decimal::ZERO
                } else if rule.free_shipping_min_items > 0
                    && item_count >= u64::from(rule.free_shipping_min_items)
                {
                    Decimal::ZERO
                } else {
                    rule.base_price
                }
            }
            // Absent or disabled rule: the documented flat-fee fallback.
            _ => {
                if subtotal >= self.fallback.free_threshold {
                    Decimal::ZERO
                } else {
                    self.fallback.flat_fee
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(id: &str, retail: i64, reseller: Option<i64>, qty: u32) -> CartLine {
        CartLine {
            item_id: id.into(),
            unit_price_retail: Decimal::new(retail, 0),
            unit_price_reseller: reseller.map(|p| Decimal::new(p, 0)),
            quantity: qty,
        }
    }

    fn rule(base: i64, threshold: i64, min_items: u32, enabled: bool) -> ShippingRule {
        ShippingRule {
            id: Uuid::new_v4(),
            customer_class: CustomerClass::Retail,
            base_price: Decimal::new(base, 0),
            free_shipping_threshold: Decimal::new(threshold, 0),
            free_shipping_min_items: min_items,
            enabled,
        }
    }

    #[test]
    fn test_fallback_when_no_rule() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 100, None, 1), line("B", 100, None, 1), line("C", 100, None, 1)];
        let totals = policy.quote(&lines, CustomerClass::Retail, None, None).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(300, 0));
        assert_eq!(totals.shipping_cost, Decimal::new(50, 0));
        assert_eq!(totals.total, Decimal::new(350, 0));
    }

    #[test]
    fn test_free_shipping_over_threshold() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 100, None, 1), line("B", 100, None, 1), line("C", 100, None, 1)];
        let r = rule(50, 250, 0, true);
        let totals = policy.quote(&lines, CustomerClass::Retail, Some(&r), None).unwrap();
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(300, 0));
    }

    #[test]
    fn test_free_shipping_min_items() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 50, None, 2), line("B", 50, None, 1)];
        let r = rule(50, 1000, 3, true);
        let totals = policy.quote(&lines, CustomerClass::Retail, Some(&r), None).unwrap();
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
    }

    #[test]
    fn test_disabled_rule_uses_fallback_not_base_price() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 100, None, 3)];
        let r = rule(25, 100, 0, false);
        let totals = policy.quote(&lines, CustomerClass::Retail, Some(&r), None).unwrap();
        // 300 < 750, so the fallback flat fee applies, not the rule's 25.
        assert_eq!(totals.shipping_cost, Decimal::new(50, 0));
    }

    #[test]
    fn test_zero_threshold_never_grants_free_shipping() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 100, None, 1)];
        let r = rule(50, 0, 0, true);
        let totals = policy.quote(&lines, CustomerClass::Retail, Some(&r), None).unwrap();
        assert_eq!(totals.shipping_cost, Decimal::new(50, 0));
    }

    #[test]
    fn test_promo_discount_skips_shipping() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 300, None, 1)];
        let r = rule(50, 1000, 0, true);
        let totals = policy
            .quote(&lines, CustomerClass::Retail, Some(&r), Some("ARGAN20"))
            .unwrap();
        assert_eq!(totals.discount, Decimal::new(60, 0));
        // 300 - 60 + 50: the discount never touches the shipping fee.
        assert_eq!(totals.total, Decimal::new(290, 0));
    }

    #[test]
    fn test_reseller_price_selected() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 100, Some(80), 2)];
        let totals = policy.quote(&lines, CustomerClass::Reseller, None, None).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(160, 0));
        // Retail shoppers still pay the retail price on the same line.
        let retail = policy.quote(&lines, CustomerClass::Retail, None, None).unwrap();
        assert_eq!(retail.subtotal, Decimal::new(200, 0));
    }

    #[test]
    fn test_reseller_without_reseller_price_pays_retail() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 100, None, 1)];
        let totals = policy.quote(&lines, CustomerClass::Reseller, None, None).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(100, 0));
    }

    #[test]
    fn test_empty_cart() {
        let policy = PricingPolicy::default();
        let r = rule(50, 250, 0, true);
        let totals = policy.quote(&[], CustomerClass::Retail, Some(&r), None).unwrap();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::ZERO);
        // Zero subtotal does not reach the threshold, so the base fee stands.
        assert_eq!(totals.shipping_cost, Decimal::new(50, 0));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let policy = PricingPolicy::default();
        let lines = vec![line("A", 100, None, 0)];
        let err = policy.quote(&lines, CustomerClass::Retail, None, None).unwrap_err();
        assert!(matches!(err, CommerceError::InvalidQuantity { quantity: 0, .. }));
    }

    #[test]
    fn test_quantity_increase_never_lowers_subtotal() {
        let policy = PricingPolicy::default();
        let r = rule(50, 500, 0, true);
        let mut prev = Decimal::MIN;
        for qty in 1..=20 {
            let lines = vec![line("A", 40, None, qty)];
            let totals = policy.quote(&lines, CustomerClass::Retail, Some(&r), None).unwrap();
            // The grand total may dip when a quantity bump crosses the
            // free-shipping threshold; the subtotal never goes down.
            assert!(totals.subtotal >= prev);
            prev = totals.subtotal;
        }
    }

    proptest! {
        #[test]
        fn prop_totals_round_trip(
            prices in prop::collection::vec((0i64..5000, prop::option::of(0i64..5000), 1u32..40), 0..8),
            base in 0i64..200,
            threshold in 0i64..2000,
            min_items in 0u32..10,
            enabled in any::<bool>(),
            has_rule in any::<bool>(),
            reseller in any::<bool>(),
            code in prop::option::of(prop::sample::select(vec!["ARGAN20", "argan20 ", "BOGUS", ""])),
        ) {
            let lines: Vec<CartLine> = prices
                .iter()
                .enumerate()
                .map(|(i, (retail, reseller_price, qty))| CartLine {
                    item_id: format!("item-{i}"),
                    unit_price_retail: Decimal::new(*retail, 0),
                    unit_price_reseller: reseller_price.map(|p| Decimal::new(p, 0)),
                    quantity: *qty,
                })
                .collect();
            let r = ShippingRule {
                id: Uuid::new_v4(),
                customer_class: CustomerClass::Retail,
                base_price: Decimal::new(base, 0),
                free_shipping_threshold: Decimal::new(threshold, 0),
                free_shipping_min_items: min_items,
                enabled,
            };
            let class = if reseller { CustomerClass::Reseller } else { CustomerClass::Retail };
            let policy = PricingPolicy::default();
            let rule_arg = has_rule.then_some(&r);

            let totals = policy.quote(&lines, class, rule_arg, code).unwrap();

            prop_assert_eq!(totals.total, totals.subtotal - totals.discount + totals.shipping_cost);
            prop_assert!(totals.total >= Decimal::ZERO);
            prop_assert!(totals.discount <= totals.subtotal);
            let expected_fee = match rule_arg {
                Some(r) if r.enabled => r.base_price,
                _ => FallbackShipping::default().flat_fee,
            };
            prop_assert!(
                totals.shipping_cost == Decimal::ZERO || totals.shipping_cost == expected_fee
            );
        }
    }
}
