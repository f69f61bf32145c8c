//! HTTP adapters - REST API implementations.

pub mod billing;
mod server;

pub use billing::{billing_router, BillingAppState, SessionUser};
pub use server::app;
