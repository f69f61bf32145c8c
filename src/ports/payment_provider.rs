//! Payment provider port for external payment processing.
//!
//! Defines the contract for the payment gateway integration. Implementations
//! handle customer creation, hosted checkout, subscription retrieval, and
//! webhook signature verification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::billing::ProviderEvent;

/// Port for the payment provider integration.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    ///
    /// Returns the provider's customer ID for future reference.
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<Customer, ProviderError>;

    /// Create a hosted checkout session in subscription mode.
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProviderError>;

    /// Fetch current subscription detail from the provider.
    ///
    /// The provider is the source of truth for subscription state; the
    /// reconciler calls this when an event does not carry the full detail.
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ProviderError>;

    /// Verify a webhook signature and parse the event envelope.
    ///
    /// Pure computation over the shared signing secret; no network call.
    fn verify_event(&self, payload: &[u8], signature: &str)
        -> Result<ProviderEvent, ProviderError>;
}

/// Customer in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID (cus_...).
    pub id: String,

    /// Customer email.
    pub email: String,
}

/// Request to create a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Provider's customer ID.
    pub customer_id: String,

    /// Price the session subscribes to.
    pub price_id: String,

    /// Internal user ID, embedded as subscription metadata so the completed
    /// session can be attributed on the webhook side.
    pub user_id: Uuid,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,
}

/// Checkout session awaiting completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID (cs_...).
    pub id: String,

    /// URL for the customer to complete checkout.
    pub url: Option<String>,
}

/// Subscription detail as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    /// Provider's subscription ID (sub_...).
    pub id: String,

    /// Provider's customer ID.
    pub customer_id: String,

    /// Currently active price.
    pub price_id: String,

    /// Provider-reported status, stored verbatim.
    pub status: String,

    /// Current billing period end (Unix timestamp).
    pub current_period_end: i64,
}

/// Errors from payment provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure reaching the provider.
    #[error("network error: {0}")]
    Network(String),

    /// The provider returned a non-success response.
    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Webhook signature verification or envelope parsing failed.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl ProviderError {
    /// Whether this error represents a failed authenticity check rather than
    /// a provider-side failure.
    pub fn is_signature_failure(&self) -> bool {
        matches!(self, ProviderError::InvalidEvent(_))
    }
}
