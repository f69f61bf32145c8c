//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `billing` - Subscription records, webhook events, signature verification

pub mod billing;
