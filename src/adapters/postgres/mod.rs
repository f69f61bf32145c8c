//! PostgreSQL adapters implementing the persistence ports.

mod subscription_store;

pub use subscription_store::PostgresSubscriptionStore;
