//! Application layer - Commands and Handlers.
//!
//! Orchestrates domain operations across the record store and payment
//! provider ports. One handler per inbound operation.

mod checkout;
mod reconciler;

#[cfg(test)]
pub(crate) mod test_support;

pub use checkout::{CheckoutCreated, CreateCheckoutCommand, CreateCheckoutHandler, RedirectUrls};
pub use reconciler::{ReconcileEventCommand, ReconcileEventHandler, ReconcileOutcome};
