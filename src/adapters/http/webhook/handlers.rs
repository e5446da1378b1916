//! HTTP handlers for the webhook receiver endpoints.
//!
//! These handlers own the boundary pipeline: size ceiling, signature
//! verification, payload normalization, and idempotent persistence. They
//! never run business logic; success means "durably recorded".

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, Json, Query, Request, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;

use crate::application::handlers::webhook::IngestWebhookHandler;
use crate::config::ProvidersConfig;
use crate::domain::webhook::providers::{hotmart, mercado_pago};
use crate::domain::webhook::WebhookError;
use crate::ports::WebhookEventRepository;

use super::dto::{ErrorResponse, HealthResponse, ReceivedResponse};

/// Hard ceiling on accepted request bodies: 1 MiB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request body buffered under the ingestion size ceiling.
///
/// Owns the limit instead of relying on the framework's default buffer
/// cap, so an oversized body of any size is rejected with the receiver's
/// JSON 413 rather than a framework plain-text response. A declared
/// `Content-Length` over the ceiling is rejected before reading; bodies
/// streamed without one are cut off at the ceiling.
pub struct BoundedBody(Bytes);

#[axum::async_trait]
impl<S> FromRequest<S> for BoundedBody
where
    S: Send + Sync,
{
    type Rejection = WebhookApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        if let Some(size) = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if size > MAX_BODY_BYTES {
                return Err(WebhookError::PayloadTooLarge {
                    size,
                    limit: MAX_BODY_BYTES,
                }
                .into());
            }
        }

        // The exact size is unknown once the stream limit trips.
        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| WebhookError::PayloadTooLarge {
                size: MAX_BODY_BYTES + 1,
                limit: MAX_BODY_BYTES,
            })?;

        Ok(Self(bytes))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the receiver, cloned per request.
#[derive(Clone)]
pub struct WebhookAppState {
    pub repository: Arc<dyn WebhookEventRepository>,
    pub providers: ProvidersConfig,
}

impl WebhookAppState {
    fn ingest_handler(&self) -> IngestWebhookHandler {
        IngestWebhookHandler::new(self.repository.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/mercadopago - receive a Mercado Pago notification.
///
/// The signature covers the query-string `data.id`, the `x-request-id`
/// header, and the timestamp from `x-signature`; the body is parsed only
/// after the signature checks out.
pub async fn receive_mercado_pago(
    State(state): State<WebhookAppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    BoundedBody(body): BoundedBody,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature_header = headers
        .get(mercado_pago::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let request_id = headers
        .get(mercado_pago::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    let query_data_id = query.get("data.id").map(String::as_str);

    mercado_pago::verify(
        state.providers.mercado_pago_secret.as_ref(),
        signature_header,
        request_id,
        query_data_id,
    )?;

    let payload = parse_body(&body)?;
    let event = mercado_pago::normalize(payload, query_data_id)?;

    let outcome = state.ingest_handler().handle(event).await?;
    Ok(Json(ReceivedResponse::from(outcome)))
}

/// POST /webhooks/hotmart - receive a Hotmart notification.
///
/// Hotmart embeds its shared secret (`hottok`) in the body, so the body
/// must be parsed before verification.
pub async fn receive_hotmart(
    State(state): State<WebhookAppState>,
    BoundedBody(body): BoundedBody,
) -> Result<impl IntoResponse, WebhookApiError> {
    let payload = parse_body(&body)?;
    hotmart::verify(state.providers.hotmart_token.as_ref(), &payload)?;
    let event = hotmart::normalize(payload)?;

    let outcome = state.ingest_handler().handle(event).await?;
    Ok(Json(ReceivedResponse::from(outcome)))
}

/// GET /health - liveness check.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn parse_body(body: &Bytes) -> Result<serde_json::Value, WebhookError> {
    serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts receiver errors to HTTP responses.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "webhook request failed");
        } else {
            tracing::warn!(error = %self.0, "webhook request rejected");
        }

        let body = ErrorResponse::new(self.0.error_code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
