//! Guest Order Aggregation

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An order placed without an account, identified only by email.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuestOrder {
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub city: Option<String>,
    pub total: Decimal,
    pub order_number: String,
    pub created_at: DateTime<Utc>,
}

/// A synthesized, non-persisted customer record for the admin customer view.
/// One profile per distinct normalized email.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VirtualGuestProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub total_spent: Decimal,
    pub total_orders: u64,
    pub last_order: String,
    pub created_at: DateTime<Utc>,
}

pub struct GuestAggregator;

impl GuestAggregator {
    /// Folds guest orders into one virtual profile per distinct normalized
    /// (lower-cased, trimmed) email.
    ///
    /// Input order does not matter: orders are sorted by `created_at`
    /// descending first, so the most recent order is authoritative for the
    /// display fields (`name`, `phone`, `city`) and `last_order`. Every order
    /// counts toward `total_spent` and `total_orders` regardless of status.
    /// Output keeps insertion order: most recently active guest first.
    pub fn fold(mut orders: Vec<GuestOrder>) -> Vec<VirtualGuestProfile> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut profiles: Vec<VirtualGuestProfile> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for order in orders {
            let email = normalize_email(&order.customer_email);
            match index.get(&email) {
                Some(&slot) => {
                    let profile = &mut profiles[slot];
                    profile.total_spent += order.total;
                    profile.total_orders += 1;
                    // Newest-first iteration, so the oldest order lands last
                    // and marks when the guest first appeared.
                    profile.created_at = order.created_at;
                }
                None => {
                    index.insert(email.clone(), profiles.len());
                    profiles.push(VirtualGuestProfile {
                        id: format!("guest-{email}"),
                        name: order.customer_name,
                        email,
                        phone: order.customer_phone,
                        city: order.city,
                        total_spent: order.total,
                        total_orders: 1,
                        last_order: order.order_number,
                        created_at: order.created_at,
                    });
                }
            }
        }
        profiles
    }

    /// Re-sorts profiles by `total_spent` descending for the "top spenders"
    /// admin view.
    pub fn by_top_spenders(mut profiles: Vec<VirtualGuestProfile>) -> Vec<VirtualGuestProfile> {
        profiles.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
        profiles
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
