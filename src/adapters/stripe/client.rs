//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API with
//! form-encoded requests and basic auth. Webhook verification is delegated
//! to the domain [`WebhookVerifier`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::error;

use crate::domain::billing::{ProviderEvent, SubscriptionData, WebhookVerifier};
use crate::ports::{
    CheckoutSession, CheckoutSessionRequest, Customer, PaymentProvider, ProviderError,
    ProviderSubscription,
};

use super::api_types::{StripeCheckoutSession, StripeCustomer, StripeErrorResponse};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            api_key,
            webhook_secret,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing against a stub server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe adapter implementing the `PaymentProvider` port.
pub struct StripeClient {
    config: StripeConfig,
    http_client: reqwest::Client,
    verifier: WebhookVerifier,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let verifier = WebhookVerifier::new(config.webhook_secret.clone());
        Self {
            config,
            http_client: reqwest::Client::new(),
            verifier,
        }
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Self::parse_response(path, response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Self::parse_response(path, response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            error!(path = %path, status = status.as_u16(), message = %message, "Stripe API call failed");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

/// Form parameters for a hosted checkout session.
///
/// The user id is written to the session's own metadata, which is what the
/// `checkout.session.completed` event carries; the `subscription_data` copy
/// additionally lands on the resulting Subscription object.
fn checkout_session_params(request: CheckoutSessionRequest) -> Vec<(&'static str, String)> {
    vec![
        ("mode", "subscription".to_string()),
        ("customer", request.customer_id),
        ("payment_method_types[0]", "card".to_string()),
        ("billing_address_collection", "required".to_string()),
        ("allow_promotion_codes", "true".to_string()),
        ("line_items[0][price]", request.price_id),
        ("line_items[0][quantity]", "1".to_string()),
        ("metadata[userId]", request.user_id.to_string()),
        (
            "subscription_data[metadata][userId]",
            request.user_id.to_string(),
        ),
        ("success_url", request.success_url),
        ("cancel_url", request.cancel_url),
    ]
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<Customer, ProviderError> {
        let mut params = vec![("email", email.to_string())];
        if let Some(name) = name {
            params.push(("name", name.to_string()));
        }

        let customer: StripeCustomer = self.post_form("/v1/customers", &params).await?;

        Ok(Customer {
            id: customer.id,
            email: customer.email.unwrap_or_else(|| email.to_string()),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let params = checkout_session_params(request);

        let session: StripeCheckoutSession =
            self.post_form("/v1/checkout/sessions", &params).await?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ProviderError> {
        let detail: SubscriptionData = self
            .get(&format!("/v1/subscriptions/{}", subscription_id))
            .await?;

        let price_id = detail
            .price_id()
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "subscription {} has no line items",
                    detail.id
                ))
            })?
            .to_string();

        Ok(ProviderSubscription {
            id: detail.id,
            customer_id: detail.customer,
            price_id,
            status: detail.status,
            current_period_end: detail.current_period_end,
        })
    }

    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ProviderEvent, ProviderError> {
        self.verifier
            .verify_and_parse(payload, signature)
            .map_err(|e| ProviderError::InvalidEvent(e.to_string()))
    }
}
