//! HTTP Handlers

use std::net::SocketAddr;

use axum::{
    Extension, Json,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use checkout_core::{
    AddOn, Catalog, Countdown, DiscountWindow, PriceBreakdown, RateLimitDecision, RateLimiter,
    ScopedStore, VISITOR_HIGH_WATER_MARK, Variant, VariantAssigner, compute_pricing,
    sweep_expired_visitors, validate_add_ons,
};
use checkout_payments::{
    CheckoutOrder, CreatedSession, LeadRecord, SessionDraft, WebhookEvent, WebhookHandler,
    notify_detached,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub headers: HeaderMap,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            headers: HeaderMap::new(),
        }
    }

    fn payments_disabled() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "PAYMENTS_DISABLED",
            "Payments not configured",
        )
    }

    fn rate_limited(decision: &RateLimitDecision) -> Self {
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many requests. Please wait a minute and try again.",
        );
        let headers = [
            ("x-ratelimit-limit", decision.limit.to_string()),
            ("x-ratelimit-remaining", decision.remaining.to_string()),
            ("x-ratelimit-reset", decision.reset_at.timestamp_millis().to_string()),
        ];
        for (name, value) in headers {
            if let Ok(value) = HeaderValue::from_str(&value) {
                err.headers.insert(HeaderName::from_static(name), value);
            }
        }
        err
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code.into(),
        });
        (self.status, self.headers, body).into_response()
    }
}

/// Checkout/lead submission: the order plus an optional visitor id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub order: CheckoutOrder,

    #[serde(default)]
    pub visitor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub base_price: u64,
    #[serde(default)]
    pub selected_upsells: Vec<AddOn>,
    #[serde(default)]
    pub has_discount: bool,
    #[serde(default)]
    pub has_recovery_discount: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferResponse {
    pub visitor_id: String,
    pub discount_active: bool,
    pub countdown: Countdown,
    pub display: String,
    pub low_time: bool,
    pub variant: Variant,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadAccepted {
    pub lead_id: String,
    pub total_price: u64,
}

// ============================================================================
// Helpers
// ============================================================================

/// Who to rate limit: first forwarded hop, then `x-real-ip`, then the peer
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".into())
}

fn enforce_rate_limit(
    limiter: &RateLimiter,
    headers: &HeaderMap,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
) -> Result<(), ApiError> {
    let peer = peer.map(|Extension(ConnectInfo(addr))| addr);
    let identifier = client_identifier(headers, peer);
    let decision = limiter.check(&identifier);

    if decision.allowed {
        return Ok(());
    }

    tracing::warn!(
        client = %identifier,
        reset_at = %decision.reset_at,
        "Rate limit exceeded"
    );
    Err(ApiError::rate_limited(&decision))
}

fn valid_visitor_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn invalid_input(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
}

/// Validate the order and settle the discount flags against our own view
/// of the visitor's window.
///
/// Only windows this server has already started can veto a discount
/// claim. An unknown `visitorId`, or none at all, reads as a first visit
/// and the claim stands, so this is a consistency check for honest
/// clients rather than a guard against a determined one.
fn prepare_order(state: &AppState, request: CheckoutRequest) -> Result<CheckoutOrder, ApiError> {
    let CheckoutRequest {
        mut order,
        visitor_id,
    } = request;

    order
        .validate()
        .map_err(|e| invalid_input(e.user_message()))?;

    state
        .catalog
        .verify(&order.package_name, order.base_price, &order.selected_upsells)
        .map_err(|e| {
            tracing::warn!(error = %e, "Order does not match catalog");
            ApiError::new(StatusCode::BAD_REQUEST, "CATALOG_MISMATCH", e.user_message())
        })?;

    if let Some(visitor_id) = visitor_id.filter(|id| valid_visitor_id(id)) {
        let window = DiscountWindow::new(ScopedStore::new(state.visitors.as_ref(), &visitor_id));
        let active = window.is_active().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discount window unreadable; treating as active");
            true
        });

        if order.has_discount && !active {
            tracing::info!(visitor = %visitor_id, "Dropping expired discount claim");
            order.has_discount = false;
        }
    }

    Ok(order)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.sessions.is_some(),
    })
}

/// Packages and add-ons on offer
pub async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.catalog.as_ref().clone())
}

/// Price a selection without creating anything
pub async fn quote(Json(payload): Json<QuoteRequest>) -> Result<Json<PriceBreakdown>, ApiError> {
    validate_add_ons(&payload.selected_upsells).map_err(|e| invalid_input(e.user_message()))?;

    Ok(Json(compute_pricing(
        payload.base_price,
        &payload.selected_upsells,
        payload.has_discount,
        payload.has_recovery_discount,
    )))
}

/// Discount window, countdown and A/B variant for one visitor.
///
/// The first call for a visitor starts their 48-hour window.
pub async fn visitor_offer(
    State(state): State<AppState>,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    Path(visitor_id): Path<String>,
) -> Result<Json<OfferResponse>, ApiError> {
    enforce_rate_limit(&state.offer_limiter, &headers, peer)?;

    if !valid_visitor_id(&visitor_id) {
        return Err(invalid_input("visitor id must be 1-64 letters, digits, '-' or '_'"));
    }

    let storage_error = |e: checkout_core::CoreError| {
        tracing::error!(error = %e, "Visitor storage error");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.user_message())
    };

    let now = Utc::now();
    let window = DiscountWindow::new(ScopedStore::new(state.visitors.as_ref(), &visitor_id));
    let countdown = window.countdown_at(now).map_err(storage_error)?;

    let assigner = VariantAssigner::new(ScopedStore::new(state.visitors.as_ref(), &visitor_id));
    let variant = assigner.get_or_assign().map_err(storage_error)?;

    sweep_expired_visitors(&state.visitors, now, VISITOR_HIGH_WATER_MARK);

    Ok(Json(OfferResponse {
        visitor_id,
        discount_active: !countdown.is_expired,
        display: countdown.to_string(),
        low_time: countdown.is_low_time(),
        countdown,
        variant,
    }))
}

/// Create Stripe checkout session
pub async fn create_checkout_session(
    State(state): State<AppState>,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CreatedSession>, ApiError> {
    enforce_rate_limit(&state.rate_limiter, &headers, peer)?;

    let sessions = state
        .sessions
        .as_ref()
        .ok_or_else(ApiError::payments_disabled)?;

    let order = prepare_order(&state, payload)?;

    let origin = headers.get("origin").and_then(|v| v.to_str().ok());
    let base_url = state.config.redirect_base(origin);

    let draft = SessionDraft::from_order(&order, &base_url)
        .map_err(|e| invalid_input(e.user_message()))?;

    let session = sessions.create_session(&draft).await.map_err(|e| {
        tracing::error!("Checkout error: {}", e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CHECKOUT_ERROR",
            e.user_message(),
        )
    })?;

    Ok(Json(session))
}

/// Record a lead in the leads sheet
pub async fn submit_lead(
    State(state): State<AppState>,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<LeadAccepted>), ApiError> {
    enforce_rate_limit(&state.rate_limiter, &headers, peer)?;

    let order = prepare_order(&state, payload)?;
    let pricing = order.pricing();
    let lead = LeadRecord::from_order(&order, &pricing, Utc::now());

    tracing::info!(
        lead_id = %lead.lead_id,
        package = %lead.package,
        total = lead.total_price,
        "Lead received"
    );
    notify_detached(state.leads.clone(), &lead);

    Ok((
        StatusCode::ACCEPTED,
        Json(LeadAccepted {
            lead_id: lead.lead_id,
            total_price: lead.total_price,
        }),
    ))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or_else(ApiError::payments_disabled)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "MISSING_SIGNATURE",
                "Missing Stripe signature",
            )
        })?;

    let handler = WebhookHandler::new(state.orders.clone());

    let event = handler.parse_event(&body, signature, secret).map_err(|e| {
        tracing::warn!("Webhook signature failed: {}", e);
        ApiError::new(StatusCode::BAD_REQUEST, "INVALID_SIGNATURE", "Invalid signature")
    })?;

    match handler.handle(&event) {
        Ok(WebhookEvent::CheckoutCompleted(record)) => {
            tracing::debug!(session_id = %record.stripe_session_id, "Order forwarded");
        }
        Ok(WebhookEvent::Other { .. }) => {}
        Err(e) => {
            tracing::error!("Webhook processing error: {}", e);
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "WEBHOOK_ERROR",
                "Webhook processing failed",
            ));
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}
