//! Billing error taxonomy.
//!
//! One error enum spans both operations, with HTTP status mapping and
//! retryability semantics. The provider retries webhook delivery on non-2xx,
//! so 5xx responses are the retry mechanism for transient failures.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by checkout initiation and event reconciliation.
#[derive(Debug, Error)]
pub enum BillingError {
    /// No valid caller identity was presented.
    #[error("Unauthorized")]
    Unauthorized,

    /// A required field is missing or malformed.
    #[error("{0}")]
    InvalidRequest(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Webhook authenticity check failed. Always terminal.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// A payment provider call failed.
    #[error("Payment provider error: {0}")]
    Upstream(String),

    /// A record store operation failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl BillingError {
    /// Maps the error to its HTTP status code.
    ///
    /// 4xx responses are terminal; 5xx responses make the provider redeliver
    /// the event.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Unauthorized => StatusCode::UNAUTHORIZED,
            BillingError::InvalidRequest(_) | BillingError::InvalidSignature(_) => {
                StatusCode::BAD_REQUEST
            }
            BillingError::NotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Upstream(_) | BillingError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the provider should retry delivery after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Upstream(_) | BillingError::Store(_))
    }
}
