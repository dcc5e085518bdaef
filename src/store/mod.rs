//! Settings and order-table collaborators

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::guests::GuestOrder;
use crate::domain::pricing::{CustomerClass, ShippingRule};
use crate::{CommerceError, Result};

#[derive(Clone, Debug, sqlx::FromRow)]
struct ShippingRuleRow {
    id: Uuid,
    customer_class: String,
    base_price: Decimal,
    free_shipping_threshold: Decimal,
    free_shipping_min_items: i32,
    enabled: bool,
}

impl ShippingRuleRow {
    fn into_rule(self) -> Option<ShippingRule> {
        let class = CustomerClass::parse(&self.customer_class)?;
        Some(ShippingRule {
            id: self.id,
            customer_class: class,
            base_price: self.base_price,
            free_shipping_threshold: self.free_shipping_threshold,
            free_shipping_min_items: self.free_shipping_min_items.max(0) as u32,
            enabled: self.enabled,
        })
    }
}

/// The editable fields of a rule row. The admin form saves them together on
/// explicit save; last write wins, no versioning.
#[derive(Clone, Debug, Deserialize)]
pub struct ShippingRuleChanges {
    pub base_price: Decimal,
    pub free_shipping_threshold: Decimal,
    pub free_shipping_min_items: u32,
    pub enabled: bool,
}

/// Reads and writes per-class shipping rules in the `shipping_settings` table.
#[derive(Clone)]
pub struct ShippingRuleStore {
    db: PgPool,
}

impl ShippingRuleStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The one-or-zero rule configured for a class. `Ok(None)` is a confirmed
    /// absence and selects the fallback policy downstream; a query failure is
    /// returned as an error, never folded into `None`.
    pub async fn get_rule_for(&self, class: CustomerClass) -> Result<Option<ShippingRule>> {
        let row = sqlx::query_as::<_, ShippingRuleRow>(
            "SELECT id, customer_class, base_price, free_shipping_threshold, free_shipping_min_items, enabled FROM shipping_settings WHERE customer_class = $1",
        )
        .bind(class.as_str())
        .fetch_optional(&self.db)
        .await
        .map_err(|e| CommerceError::RuleFetch(e.to_string()))?;
        Ok(row.and_then(ShippingRuleRow::into_rule))
    }

    pub async fn list_rules(&self) -> Result<Vec<ShippingRule>> {
        let rows = sqlx::query_as::<_, ShippingRuleRow>(
            "SELECT id, customer_class, base_price, free_shipping_threshold, free_shipping_min_items, enabled FROM shipping_settings ORDER BY customer_class",
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| CommerceError::RuleFetch(e.to_string()))?;
        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match row.into_rule() {
                Some(rule) => rules.push(rule),
                None => tracing::warn!("skipping shipping rule {} with unknown customer class", id),
            }
        }
        Ok(rules)
    }

    /// Persists one rule row as edited in the admin settings form.
    pub async fn save_rule(&self, id: Uuid, changes: &ShippingRuleChanges) -> Result<ShippingRule> {
        let row = sqlx::query_as::<_, ShippingRuleRow>(
            "UPDATE shipping_settings SET base_price = $2, free_shipping_threshold = $3, free_shipping_min_items = $4, enabled = $5, updated_at = NOW() WHERE id = $1 RETURNING id, customer_class, base_price, free_shipping_threshold, free_shipping_min_items, enabled",
        )
        .bind(id)
        .bind(changes.base_price)
        .bind(changes.free_shipping_threshold)
        .bind(changes.free_shipping_min_items as i32)
        .bind(changes.enabled)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| CommerceError::Storage(e.to_string()))?;
        row.and_then(ShippingRuleRow::into_rule).ok_or(CommerceError::RuleNotFound)
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
struct GuestOrderRow {
    customer_email: String,
    customer_name: String,
    customer_phone: Option<String>,
    city: Option<String>,
    total: Decimal,
    order_number: String,
    created_at: DateTime<Utc>,
}

impl GuestOrderRow {
    fn into_order(self) -> GuestOrder {
        GuestOrder {
            customer_email: self.customer_email,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            city: self.city,
            total: self.total,
            order_number: self.order_number,
            created_at: self.created_at,
        }
    }
}

/// Reads guest orders (rows with no linked customer account) for the admin
/// customer view aggregation.
#[derive(Clone)]
pub struct GuestOrderStore {
    db: PgPool,
}

impl GuestOrderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn guest_orders(&self) -> Result<Vec<GuestOrder>> {
        let rows = sqlx::query_as::<_, GuestOrderRow>(
            "SELECT customer_email, customer_name, customer_phone, city, total, order_number, created_at FROM orders WHERE customer_id IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| CommerceError::Storage(e.to_string()))?;
        Ok(rows.into_iter().map(GuestOrderRow::into_order).collect())
    }
}
