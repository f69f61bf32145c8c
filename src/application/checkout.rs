//! Checkout initiation handler.
//!
//! Resolves the authenticated caller to a known user, ensures a provider
//! customer exists (lazily, reusing the id cached on any existing
//! subscription record), and opens a hosted checkout session in subscription
//! mode.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::billing::BillingError;
use crate::ports::{CheckoutSessionRequest, PaymentProvider, SubscriptionStore};

/// Command to initiate checkout for an authenticated caller.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    /// Caller identity, as established by the HTTP layer.
    pub email: String,

    /// Price the caller wants to subscribe to.
    pub price_id: String,
}

/// Result of checkout initiation.
#[derive(Debug, Clone)]
pub struct CheckoutCreated {
    /// Opaque provider session id for the frontend to redirect with.
    pub session_id: String,
}

/// Redirect targets for the hosted checkout page, derived from the
/// configured public base URL.
#[derive(Debug, Clone)]
pub struct RedirectUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl RedirectUrls {
    /// Standard post-checkout destinations under the application's public
    /// base URL.
    pub fn from_base(public_base_url: &str) -> Self {
        let base = public_base_url.trim_end_matches('/');
        Self {
            success_url: format!("{}/dashboard?success=true", base),
            cancel_url: format!("{}/pricing?canceled=true", base),
        }
    }
}

/// Handler for checkout initiation.
pub struct CreateCheckoutHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
    redirect_urls: RedirectUrls,
}

impl CreateCheckoutHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn PaymentProvider>,
        redirect_urls: RedirectUrls,
    ) -> Self {
        Self {
            store,
            provider,
            redirect_urls,
        }
    }

    /// Initiate checkout and return the provider session id.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when the price id is empty.
    /// - `NotFound` when the caller's email does not resolve to a user.
    /// - `Upstream` when a provider call fails.
    /// - `Store` when the user lookup fails.
    #[instrument(skip(self, command), fields(price_id = %command.price_id))]
    pub async fn handle(
        &self,
        command: CreateCheckoutCommand,
    ) -> Result<CheckoutCreated, BillingError> {
        if command.price_id.trim().is_empty() {
            return Err(BillingError::InvalidRequest(
                "Price ID is required".to_string(),
            ));
        }

        let account = self
            .store
            .find_user_by_email(&command.email)
            .await
            .map_err(|e| BillingError::Store(e.to_string()))?
            .ok_or(BillingError::NotFound("User"))?;

        let customer_id = match account.stripe_customer_id() {
            Some(id) => id.to_string(),
            None => {
                let customer = self
                    .provider
                    .create_customer(&account.email, account.name.as_deref())
                    .await
                    .map_err(|e| BillingError::Upstream(e.to_string()))?;
                info!(customer_id = %customer.id, "created provider customer");
                customer.id
            }
        };

        let session = self
            .provider
            .create_checkout_session(CheckoutSessionRequest {
                customer_id,
                price_id: command.price_id,
                user_id: account.id,
                success_url: self.redirect_urls.success_url.clone(),
                cancel_url: self.redirect_urls.cancel_url.clone(),
            })
            .await
            .map_err(|e| BillingError::Upstream(e.to_string()))?;

        info!(session_id = %session.id, user_id = %account.id, "checkout session created");

        Ok(CheckoutCreated {
            session_id: session.id,
        })
    }
}
