//! Argan Commerce - Pricing & Shipping Policy Service

use anyhow::Result;
use argan_commerce::{
    CartLine, CustomerClass, GuestAggregator, GuestOrderStore, OrderTotals, PricingPolicy,
    ShippingRule, ShippingRuleChanges, ShippingRuleStore, VirtualGuestProfile,
};
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct AppState {
    pub rules: ShippingRuleStore,
    pub guests: GuestOrderStore,
    pub policy: PricingPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    let state = AppState {
        rules: ShippingRuleStore::new(db.clone()),
        guests: GuestOrderStore::new(db),
        policy: PricingPolicy::default(),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "argan-commerce"})) }))
        .route("/api/v1/pricing/quote", post(quote))
        .route("/api/v1/pricing/promo-check", post(check_promo))
        .route("/api/v1/shipping-rules", get(list_shipping_rules))
        .route("/api/v1/shipping-rules/:id", put(save_shipping_rule))
        .route("/api/v1/guest-profiles", get(list_guest_profiles))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("🚀 Argan Commerce pricing service listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate]
    pub lines: Vec<QuoteLine>,
    pub customer_class: CustomerClass,
    pub promo_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteLine {
    pub item_id: String,
    pub unit_price_retail: Decimal,
    pub unit_price_reseller: Option<Decimal>,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

async fn quote(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> Result<Json<OrderTotals>, (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    // A failed rule fetch is surfaced, never silently priced with the fallback.
    let rule = s.rules.get_rule_for(r.customer_class).await.map_err(|e| (StatusCode::BAD_GATEWAY, format!("unable to calculate shipping: {}", e)))?;
    let lines: Vec<CartLine> = r.lines.into_iter()
        .map(|l| CartLine { item_id: l.item_id, unit_price_retail: l.unit_price_retail, unit_price_reseller: l.unit_price_reseller, quantity: l.quantity })
        .collect();
    let totals = s.policy.quote(&lines, r.customer_class, rule.as_ref(), r.promo_code.as_deref())
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    Ok(Json(totals))
}

#[derive(Debug, Deserialize)] pub struct PromoCheckRequest { pub code: String }
#[derive(Debug, Serialize)] pub struct PromoCheckResponse { pub code: String, pub rate: Decimal, pub valid: bool }

async fn check_promo(State(s): State<AppState>, Json(r): Json<PromoCheckRequest>) -> Json<PromoCheckResponse> {
    let rate = s.policy.promo().resolve(Some(&r.code));
    Json(PromoCheckResponse { valid: rate > Decimal::ZERO, rate, code: r.code })
}

async fn list_shipping_rules(State(s): State<AppState>) -> Result<Json<Vec<ShippingRule>>, (StatusCode, String)> {
    s.rules.list_rules().await.map(Json).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn save_shipping_rule(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<ShippingRuleChanges>) -> Result<Json<ShippingRule>, (StatusCode, String)> {
    if r.base_price < Decimal::ZERO || r.free_shipping_threshold < Decimal::ZERO {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "negative amounts are not allowed".to_string()));
    }
    match s.rules.save_rule(id, &r).await {
        Ok(rule) => Ok(Json(rule)),
        Err(argan_commerce::CommerceError::RuleNotFound) => Err((StatusCode::NOT_FOUND, "Not found".to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

#[derive(Debug, Deserialize)] pub struct GuestProfileParams { pub sort: Option<String> }

async fn list_guest_profiles(State(s): State<AppState>, Query(p): Query<GuestProfileParams>) -> Result<Json<Vec<VirtualGuestProfile>>, (StatusCode, String)> {
    let orders = s.guests.guest_orders().await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let mut profiles = GuestAggregator::fold(orders);
    if p.sort.as_deref() == Some("spend") {
        profiles = GuestAggregator::by_top_spenders(profiles);
    }
    Ok(Json(profiles))
}
