//! Stripe adapter implementing the `PaymentProvider` port.

mod api_types;
mod client;

pub use client::{StripeClient, StripeConfig};
