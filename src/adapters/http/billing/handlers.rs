//! HTTP handlers for the billing endpoints.
//!
//! Connect axum routes to the application layer handlers. The webhook
//! handler receives the raw body bytes because the signature covers the
//! payload byte-for-byte.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::error;

use crate::application::{
    CreateCheckoutCommand, CreateCheckoutHandler, RedirectUrls, ReconcileEventCommand,
    ReconcileEventHandler,
};
use crate::domain::billing::BillingError;
use crate::ports::{PaymentProvider, SubscriptionStore};

use super::dto::{CheckoutRequest, CheckoutResponse, ErrorResponse, WebhookAck};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state, cloned per request with Arc-wrapped ports.
#[derive(Clone)]
pub struct BillingAppState {
    pub subscription_store: Arc<dyn SubscriptionStore>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub redirect_urls: RedirectUrls,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.subscription_store.clone(),
            self.payment_provider.clone(),
            self.redirect_urls.clone(),
        )
    }

    pub fn reconcile_handler(&self) -> ReconcileEventHandler {
        ReconcileEventHandler::new(
            self.subscription_store.clone(),
            self.payment_provider.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Caller Identity
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity extracted from the request.
///
/// The identity layer in front of this service authenticates the session and
/// forwards the caller's email in the `X-Session-Email` header. A missing or
/// unreadable header rejects the request before the handler runs.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub email: String,
}

impl<S> axum::extract::FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = BillingApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let email = parts
                .headers
                .get("X-Session-Email")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or(BillingApiError(BillingError::Unauthorized))?;

            Ok(SessionUser {
                email: email.to_string(),
            })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/checkout
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    user: SessionUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let price_id = request.price_id.unwrap_or_default();

    let created = state
        .checkout_handler()
        .handle(CreateCheckoutCommand {
            email: user.email,
            price_id,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(CheckoutResponse {
            session_id: created.session_id,
        }),
    ))
}

/// POST /api/webhooks/stripe
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            BillingError::InvalidSignature("missing Stripe-Signature header".to_string())
        })?;

    state
        .reconcile_handler()
        .handle(ReconcileEventCommand {
            payload: body.to_vec(),
            signature: signature.to_string(),
        })
        .await?;

    Ok((StatusCode::OK, Json(WebhookAck::ok())))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type converting billing errors to HTTP responses.
///
/// 5xx responses carry a generic body; the underlying failure is only logged.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();

        let message = if status.is_server_error() {
            error!(error = %self.0, "request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn response_parts(err: BillingError) -> (StatusCode, serde_json::Value) {
        let response = BillingApiError(err).into_response();
        let status = response.status();
        let bytes = futures_body(response);
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn futures_body(response: axum::response::Response) -> Vec<u8> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(async {
                to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap()
                    .to_vec()
            })
    }

    #[test]
    fn missing_identity_maps_to_unauthorized() {
        let (status, body) = response_parts(BillingError::Unauthorized);

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[test]
    fn invalid_request_surfaces_message() {
        let (status, body) =
            response_parts(BillingError::InvalidRequest("Price ID is required".to_string()));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Price ID is required");
    }

    #[test]
    fn not_found_surfaces_entity() {
        let (status, body) = response_parts(BillingError::NotFound("User"));

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[test]
    fn store_failure_hides_detail() {
        let (status, body) =
            response_parts(BillingError::Store("connection refused to 10.0.0.5".to_string()));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn signature_failure_is_bad_request() {
        let (status, _) =
            response_parts(BillingError::InvalidSignature("signature mismatch".to_string()));

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
