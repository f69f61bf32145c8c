//! Wire types for Stripe REST responses.
//!
//! Only the fields the adapter reads are modeled; Stripe's responses carry
//! far more and serde ignores the rest.

use serde::Deserialize;

/// Customer object returned by `POST /v1/customers`.
#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}

/// Checkout session object returned by `POST /v1/checkout/sessions`.
#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
