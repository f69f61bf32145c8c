//! LaunchBase billing backend.
//!
//! A thin subscription-billing service: checkout initiation against Stripe's
//! hosted checkout, and a webhook reconciler that mirrors provider-emitted
//! subscription state into a local PostgreSQL record store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
