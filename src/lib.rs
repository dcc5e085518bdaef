//! Argan Commerce Pricing Engine
//!
//! Order pricing and shipping policy for an argan-oil storefront.
//!
//! ## Features
//! - Cart subtotal, discount, shipping and grand-total computation
//! - Per-class shipping rules (retail vs. reseller) with a documented fallback
//! - Promo code resolution against an injectable rule table
//! - Guest order aggregation into virtual customer profiles

pub mod domain;
pub mod store;

use thiserror::Error;

pub use domain::guests::{GuestAggregator, GuestOrder, VirtualGuestProfile};
pub use domain::pricing::{
    CartLine, CustomerClass, FallbackShipping, OrderTotals, PricingPolicy, ShippingRule,
};
pub use domain::promo::{PromoCodeResolver, PromoRule};
pub use store::{GuestOrderStore, ShippingRuleChanges, ShippingRuleStore};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Invalid quantity {quantity} for item {item_id}")]
    InvalidQuantity { item_id: String, quantity: u32 },

    #[error("Shipping rule not found")]
    RuleNotFound,

    /// A failed rule fetch is distinct from a confirmed absence: the former
    /// surfaces here, the latter is `Ok(None)` and triggers the fallback policy.
    #[error("Shipping rule fetch failed: {0}")]
    RuleFetch(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CommerceError>;
