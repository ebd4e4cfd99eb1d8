//! Studio checkout HTTP server
//!
//! Axum server behind the marketing site: pricing quotes, visitor offers,
//! Stripe checkout sessions, lead capture and the Stripe webhook.

mod config;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_core::{Catalog, MemoryStore, RateLimiter};
use checkout_payments::{LeadSink, NullSink, SessionCreator, SheetsSink, StripeClient};

use crate::config::{LEADS_SHEET_VAR, ORDERS_SHEET_VAR, ServerConfig};
use crate::handlers::{
    create_checkout_session, get_catalog, health_check, quote, stripe_webhook, submit_lead,
    visitor_offer,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();

    // Payments
    let stripe = StripeClient::from_env().ok().map(Arc::new);
    if stripe.is_some() {
        tracing::info!("✓ Stripe configured");
    } else {
        tracing::warn!("⚠ Stripe not configured - payments disabled");
        tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET in .env");
    }

    // Sheets
    let leads = sheet_sink(LEADS_SHEET_VAR);
    let orders = sheet_sink(ORDERS_SHEET_VAR);

    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.num_seconds(),
        "Rate limiting checkout and lead submissions"
    );
    tracing::info!(
        max_requests = config.offer_rate_limit.max_requests,
        "Rate limiting visitor offers"
    );

    let state = AppState {
        catalog: Arc::new(Catalog::standard()),
        rate_limiter: Arc::new(RateLimiter::new(config.rate_limit)),
        offer_limiter: Arc::new(RateLimiter::new(config.offer_rate_limit)),
        visitors: Arc::new(MemoryStore::new()),
        webhook_secret: stripe.as_ref().map(|s| s.webhook_secret().to_string()),
        sessions: stripe.map(|s| s as Arc<dyn SessionCreator>),
        leads,
        orders,
        config: Arc::new(config.clone()),
    };

    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 checkout server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                       - Health check");
    tracing::info!("  GET  /api/catalog                  - Packages and add-ons");
    tracing::info!("  POST /api/quote                    - Price a selection");
    tracing::info!("  GET  /api/offer/{{visitor_id}}       - Discount window and variant");
    tracing::info!("  POST /api/create-checkout-session  - Create Stripe checkout");
    tracing::info!("  POST /api/leads                    - Submit a lead");
    tracing::info!("  POST /api/webhooks/stripe          - Stripe webhook");
    tracing::info!("");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn sheet_sink(var: &str) -> Arc<dyn LeadSink> {
    match SheetsSink::from_env(var) {
        Some(sink) => {
            tracing::info!(var, "✓ Sheet forwarding configured");
            Arc::new(sink)
        }
        None => {
            tracing::warn!(var, "⚠ Sheet URL not set - rows will be dropped");
            Arc::new(NullSink)
        }
    }
}

fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/catalog", get(get_catalog))
        .route("/api/quote", post(quote))
        .route("/api/offer/{visitor_id}", get(visitor_offer))
        // Checkout
        .route("/api/create-checkout-session", post(create_checkout_session))
        .route("/api/leads", post(submit_lead))
        .route("/api/webhooks/stripe", post(stripe_webhook))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
