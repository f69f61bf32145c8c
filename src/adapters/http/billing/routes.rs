//! Axum router configuration for the billing endpoints.

use axum::{routing::post, Router};

use super::handlers::{create_checkout, handle_stripe_webhook, BillingAppState};

/// Create the billing API router.
///
/// # Routes
/// - `POST /checkout` - Start the hosted checkout flow (requires caller identity)
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new().route("/checkout", post(create_checkout))
}

/// Create the webhook router.
///
/// Separate from the billing routes because webhook deliveries carry no user
/// identity; they are authenticated by signature instead.
///
/// # Routes
/// - `POST /stripe` - Reconcile a Stripe event
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the combined router, suitable for mounting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
}
