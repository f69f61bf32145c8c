//! HTTP adapter for the billing endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{CheckoutRequest, CheckoutResponse, ErrorResponse, WebhookAck};
pub use handlers::{BillingApiError, BillingAppState, SessionUser};
pub use routes::{billing_router, billing_routes, webhook_routes};
