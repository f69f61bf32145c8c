//! Record store port for subscription persistence.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::billing::{NewSubscription, SubscriptionPatch, UserAccount};

/// Port for the durable subscription record store.
///
/// Implementations must guarantee at most one record per
/// `stripe_subscription_id` and make creation idempotent under redelivery.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Create a subscription record, or refresh the existing one when the
    /// provider subscription ID is already present (upsert).
    async fn create_subscription(&self, subscription: NewSubscription) -> Result<(), StoreError>;

    /// Apply a partial update to the record keyed by the provider
    /// subscription ID. Fields left `None` on the patch are untouched.
    ///
    /// Returns `false` when no record matched the ID.
    async fn update_by_subscription_id(
        &self,
        stripe_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<bool, StoreError>;

    /// Resolve a caller's email to a known user, including any existing
    /// subscription record.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;
}

/// Errors from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped to a domain type.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
}
