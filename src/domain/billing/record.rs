//! Subscription records mirrored from the payment provider.
//!
//! The record store holds one row per provider subscription. Records are
//! created by a completed checkout, mutated in place by renewal and plan
//! change events, and soft-terminated by cancellation. They are never
//! physically deleted by the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status marker written when the provider reports a subscription as deleted.
///
/// All other status values are provider-defined and stored as-is.
pub const CANCELED_STATUS: &str = "canceled";

/// A locally stored mirror of a provider subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Local primary key.
    pub id: Uuid,

    /// Owning user. At most one active record is expected per user, but this
    /// is not enforced by the reconciler.
    pub user_id: Uuid,

    /// Provider customer identifier. Stable once assigned.
    pub stripe_customer_id: String,

    /// Provider subscription identifier. Globally unique key for updates.
    pub stripe_subscription_id: String,

    /// Identifier of the currently active plan/price.
    pub stripe_price_id: String,

    /// Renewal/expiry boundary of the current billing period.
    pub current_period_end: DateTime<Utc>,

    /// Provider-reported status. Opaque to the reconciler except for the
    /// [`CANCELED_STATUS`] marker it writes itself.
    pub status: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a subscription record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub stripe_price_id: String,
    pub current_period_end: DateTime<Utc>,
    pub status: String,
}

/// Partial update applied to an existing record, keyed by
/// `stripe_subscription_id`. Fields left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub stripe_price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl SubscriptionPatch {
    /// Patch for a renewal or plan change: price, period end, and status all
    /// move to the provider-reported values.
    pub fn renewal(
        price_id: impl Into<String>,
        period_end: DateTime<Utc>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            stripe_price_id: Some(price_id.into()),
            current_period_end: Some(period_end),
            status: Some(status.into()),
        }
    }

    /// Patch for a deleted subscription: only the status changes. Price and
    /// period end are deliberately left untouched.
    pub fn cancellation() -> Self {
        Self {
            stripe_price_id: None,
            current_period_end: None,
            status: Some(CANCELED_STATUS.to_string()),
        }
    }
}

/// A user as seen by the checkout flow: identity plus any existing
/// subscription record (carrying the cached provider customer id).
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub subscription: Option<SubscriptionRecord>,
}

impl UserAccount {
    /// Returns the provider customer id cached on the user's existing
    /// subscription record, if any.
    pub fn stripe_customer_id(&self) -> Option<&str> {
        self.subscription
            .as_ref()
            .map(|s| s.stripe_customer_id.as_str())
    }
}
