//! PostgreSQL implementation of the SubscriptionStore port.
//!
//! Per-key atomicity comes from single statements: creation is an upsert on
//! the unique `stripe_subscription_id` column, partial updates are one
//! `UPDATE ... COALESCE` statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    NewSubscription, SubscriptionPatch, SubscriptionRecord, UserAccount,
};
use crate::ports::{StoreError, SubscriptionStore};

/// PostgreSQL-backed subscription record store.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Joined user + optional subscription row for the checkout lookup.
#[derive(Debug, sqlx::FromRow)]
struct UserWithSubscriptionRow {
    user_id: Uuid,
    email: String,
    name: Option<String>,
    subscription_id: Option<Uuid>,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    stripe_price_id: Option<String>,
    current_period_end: Option<DateTime<Utc>>,
    status: Option<String>,
    sub_created_at: Option<DateTime<Utc>>,
    sub_updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserWithSubscriptionRow> for UserAccount {
    type Error = StoreError;

    fn try_from(row: UserWithSubscriptionRow) -> Result<Self, Self::Error> {
        let subscription = match row.subscription_id {
            None => None,
            Some(id) => Some(SubscriptionRecord {
                id,
                user_id: row.user_id,
                stripe_customer_id: require(row.stripe_customer_id, "stripe_customer_id")?,
                stripe_subscription_id: require(
                    row.stripe_subscription_id,
                    "stripe_subscription_id",
                )?,
                stripe_price_id: require(row.stripe_price_id, "stripe_price_id")?,
                current_period_end: require(row.current_period_end, "current_period_end")?,
                status: require(row.status, "status")?,
                created_at: require(row.sub_created_at, "created_at")?,
                updated_at: require(row.sub_updated_at, "updated_at")?,
            }),
        };

        Ok(UserAccount {
            id: row.user_id,
            email: row.email,
            name: row.name,
            subscription,
        })
    }
}

fn require<T>(value: Option<T>, column: &str) -> Result<T, StoreError> {
    value.ok_or_else(|| {
        StoreError::CorruptRecord(format!("subscription row missing {}", column))
    })
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn create_subscription(&self, subscription: NewSubscription) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, stripe_customer_id, stripe_subscription_id,
                stripe_price_id, current_period_end, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            ON CONFLICT (stripe_subscription_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_price_id = EXCLUDED.stripe_price_id,
                current_period_end = EXCLUDED.current_period_end,
                status = EXCLUDED.status,
                updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(subscription.user_id)
        .bind(&subscription.stripe_customer_id)
        .bind(&subscription.stripe_subscription_id)
        .bind(&subscription.stripe_price_id)
        .bind(subscription.current_period_end)
        .bind(&subscription.status)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn update_by_subscription_id(
        &self,
        stripe_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                stripe_price_id = COALESCE($2, stripe_price_id),
                current_period_end = COALESCE($3, current_period_end),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(patch.stripe_price_id)
        .bind(patch.current_period_end)
        .bind(patch.status)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row: Option<UserWithSubscriptionRow> = sqlx::query_as(
            r#"
            SELECT
                u.id AS user_id,
                u.email,
                u.name,
                s.id AS subscription_id,
                s.stripe_customer_id,
                s.stripe_subscription_id,
                s.stripe_price_id,
                s.current_period_end,
                s.status,
                s.created_at AS sub_created_at,
                s.updated_at AS sub_updated_at
            FROM users u
            LEFT JOIN subscriptions s ON s.user_id = u.id
            WHERE u.email = $1
            ORDER BY s.updated_at DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(UserAccount::try_from).transpose()
    }
}
