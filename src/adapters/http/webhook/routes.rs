//! Axum router configuration for the webhook receiver.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers::{health, receive_hotmart, receive_mercado_pago, WebhookAppState};

/// Create the receiver router.
///
/// # Routes
/// - `POST /webhooks/mercadopago` - Mercado Pago notifications
/// - `POST /webhooks/hotmart` - Hotmart notifications
/// - `GET /health` - liveness check
///
/// Webhook routes carry no user authentication; deliveries are verified
/// by provider signature instead. The framework's default body limit is
/// disabled: the handlers enforce their own ceiling so oversized bodies
/// always receive the receiver's JSON 413.
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new()
        .route("/webhooks/mercadopago", post(receive_mercado_pago))
        .route("/webhooks/hotmart", post(receive_hotmart))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
}
