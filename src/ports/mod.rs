//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentProvider` - Payment gateway integration (customers, checkout,
//!   subscription detail, webhook verification)
//! - `SubscriptionStore` - Durable subscription record persistence

mod payment_provider;
mod subscription_store;

pub use payment_provider::{
    CheckoutSession, CheckoutSessionRequest, Customer, PaymentProvider, ProviderError,
    ProviderSubscription,
};
pub use subscription_store::{StoreError, SubscriptionStore};
