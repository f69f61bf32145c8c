//! Billing domain module.
//!
//! Subscription records mirrored from the payment provider, webhook event
//! classification, and signature verification.
//!
//! # Module Structure
//!
//! - `record` - Subscription record types and update patches
//! - `event` - Webhook event envelope and classified event union
//! - `verifier` - HMAC signature verification for inbound events
//! - `errors` - Billing error taxonomy with HTTP status mapping

mod errors;
mod event;
mod record;
mod verifier;

pub use errors::BillingError;
pub use event::{
    BillingEvent, CheckoutSessionData, InvoiceData, PriceData, ProviderEvent, ProviderEventData,
    SubscriptionData, SubscriptionItem, SubscriptionItemList, USER_ID_METADATA_KEY,
};
pub use record::{
    NewSubscription, SubscriptionPatch, SubscriptionRecord, UserAccount, CANCELED_STATUS,
};
pub use verifier::{SignatureError, SignatureHeader, WebhookVerifier};

#[cfg(any(test, feature = "test-signatures"))]
pub use verifier::sign_test_payload;
