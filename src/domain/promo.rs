//! Promo Code Resolution

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One entry in the promo table. `usage_limit` caps total redemptions; the
/// accounting for it (and for per-session "applied" state) lives with the
/// caller, since resolution itself is stateless.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromoRule {
    pub code: String,
    pub rate: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
}

/// Maps a user-supplied code to a discount rate. Unknown, empty or expired
/// codes resolve to zero rather than erroring, so the cart UI can show "no
/// effect" instead of a failure.
#[derive(Clone, Debug)]
pub struct PromoCodeResolver {
    rules: Vec<PromoRule>,
}

impl PromoCodeResolver {
    pub fn new(rules: Vec<PromoRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: vec![] }
    }

    /// Resolves at the current time. Stateless and idempotent: resolving the
    /// same code twice yields the same rate, never a compounded one.
    pub fn resolve(&self, code: Option<&str>) -> Decimal {
        self.resolve_at(code, Utc::now())
    }

    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn resolve_at(&self, code: Option<&str>, at: DateTime<Utc>) -> Decimal {
        let Some(code) = code else { return Decimal::ZERO };
        let needle = code.trim();
        if needle.is_empty() {
            return Decimal::ZERO;
        }
        self.rules
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(needle))
            .filter(|r| r.expires_at.map_or(true, |expiry| at < expiry))
            .map(|r| r.rate)
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for PromoCodeResolver {
    /// The one code currently in production: ARGAN20, 20% off the subtotal.
    fn default() -> Self {
        Self::new(vec![PromoRule {
            code: "ARGAN20".into(),
            rate: Decimal::new(2, 1),
            expires_at: None,
            usage_limit: None,
        }])
    }
}
