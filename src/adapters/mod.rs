//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum REST API and router assembly
//! - `postgres` - sqlx-backed record store
//! - `stripe` - Stripe REST client and webhook verification

pub mod http;
pub mod postgres;
pub mod stripe;

pub use http::{app, BillingAppState};
pub use postgres::PostgresSubscriptionStore;
pub use stripe::{StripeClient, StripeConfig};
