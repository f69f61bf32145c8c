//! Webhook event reconciler.
//!
//! Stateless pipeline: authenticate the raw payload, classify the event into
//! the closed `BillingEvent` union, apply at most one record store write.
//! Every invocation starts from the event alone, so redelivered events
//! converge on the same stored state.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::billing::{
    BillingError, BillingEvent, CheckoutSessionData, NewSubscription, SubscriptionData,
    SubscriptionPatch, USER_ID_METADATA_KEY,
};
use crate::ports::{PaymentProvider, ProviderError, SubscriptionStore};

/// Command carrying the raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconcileEventCommand {
    /// Raw request body, byte-for-byte as received (the signature covers it).
    pub payload: Vec<u8>,

    /// Value of the `Stripe-Signature` header.
    pub signature: String,
}

/// What the reconciler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A subscription record was created (or refreshed, on redelivery).
    Created,

    /// An existing record was updated.
    Updated,

    /// An existing record was marked canceled.
    Canceled,

    /// An update addressed a subscription id with no local record.
    /// Acknowledged; delivery order is not guaranteed.
    SkippedUnknownRecord,

    /// The event is not one the reconciler acts on.
    Ignored,
}

/// Handler applying one bounded state transition per verified event.
pub struct ReconcileEventHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
}

impl ReconcileEventHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { store, provider }
    }

    /// Verify, classify, and apply a webhook event.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` (terminal) when authentication fails; nothing is
    ///   parsed or written.
    /// - `InvalidRequest` (terminal) when a recognized event carries a
    ///   malformed payload.
    /// - `Upstream` / `Store` (retryable) on provider or database failure,
    ///   so the provider redelivers.
    #[instrument(skip(self, command))]
    pub async fn handle(
        &self,
        command: ReconcileEventCommand,
    ) -> Result<ReconcileOutcome, BillingError> {
        let event = self
            .provider
            .verify_event(&command.payload, &command.signature)
            .map_err(|e| match e {
                ProviderError::InvalidEvent(msg) => BillingError::InvalidSignature(msg),
                other => BillingError::Upstream(other.to_string()),
            })?;

        let event_id = event.id.clone();
        let event_type = event.event_type.clone();
        info!(event_id = %event_id, event_type = %event_type, "webhook event verified");

        let outcome = match BillingEvent::classify(&event)? {
            BillingEvent::CheckoutCompleted(session) => self.apply_checkout(session).await?,
            BillingEvent::InvoicePaymentSucceeded(invoice) => {
                match invoice.subscription {
                    Some(subscription_id) => self.apply_renewal(&subscription_id).await?,
                    // One-off invoices carry no subscription; nothing to mirror.
                    None => ReconcileOutcome::Ignored,
                }
            }
            BillingEvent::SubscriptionUpdated(subscription) => {
                self.apply_plan_change(subscription).await?
            }
            BillingEvent::SubscriptionDeleted(subscription) => {
                self.apply_cancellation(&subscription.id).await?
            }
            BillingEvent::Unrecognized { event_type } => {
                info!(event_type = %event_type, "ignoring unrecognized event");
                ReconcileOutcome::Ignored
            }
        };

        info!(event_id = %event_id, outcome = ?outcome, "webhook event reconciled");
        Ok(outcome)
    }

    /// `checkout.session.completed`: attribute the session to the internal
    /// user via metadata, fetch the full subscription detail, upsert.
    async fn apply_checkout(
        &self,
        session: CheckoutSessionData,
    ) -> Result<ReconcileOutcome, BillingError> {
        let user_id = session
            .metadata
            .get(USER_ID_METADATA_KEY)
            .ok_or_else(|| {
                BillingError::InvalidRequest(format!(
                    "checkout session {} has no {} metadata",
                    session.id, USER_ID_METADATA_KEY
                ))
            })
            .and_then(|raw| {
                Uuid::parse_str(raw).map_err(|_| {
                    BillingError::InvalidRequest(format!(
                        "checkout session {} carries a malformed user id",
                        session.id
                    ))
                })
            })?;

        let subscription_id = session.subscription.ok_or_else(|| {
            BillingError::InvalidRequest(format!(
                "checkout session {} has no subscription",
                session.id
            ))
        })?;

        let detail = self
            .provider
            .retrieve_subscription(&subscription_id)
            .await
            .map_err(|e| BillingError::Upstream(e.to_string()))?;

        let period_end = chrono::DateTime::from_timestamp(detail.current_period_end, 0)
            .ok_or_else(|| {
                BillingError::InvalidRequest(format!(
                    "current_period_end out of range: {}",
                    detail.current_period_end
                ))
            })?;

        self.store
            .create_subscription(NewSubscription {
                user_id,
                stripe_customer_id: detail.customer_id,
                stripe_subscription_id: detail.id,
                stripe_price_id: detail.price_id,
                current_period_end: period_end,
                status: detail.status,
            })
            .await
            .map_err(|e| BillingError::Store(e.to_string()))?;

        Ok(ReconcileOutcome::Created)
    }

    /// `invoice.payment_succeeded`: refresh the record from provider detail.
    async fn apply_renewal(&self, subscription_id: &str) -> Result<ReconcileOutcome, BillingError> {
        let detail = self
            .provider
            .retrieve_subscription(subscription_id)
            .await
            .map_err(|e| BillingError::Upstream(e.to_string()))?;

        let period_end = chrono::DateTime::from_timestamp(detail.current_period_end, 0)
            .ok_or_else(|| {
                BillingError::InvalidRequest(format!(
                    "current_period_end out of range: {}",
                    detail.current_period_end
                ))
            })?;

        self.update(
            subscription_id,
            SubscriptionPatch::renewal(detail.price_id, period_end, detail.status),
            ReconcileOutcome::Updated,
        )
        .await
    }

    /// `customer.subscription.updated`: apply the payload directly, no fetch.
    async fn apply_plan_change(
        &self,
        subscription: SubscriptionData,
    ) -> Result<ReconcileOutcome, BillingError> {
        let period_end = subscription.period_end()?;
        let patch = SubscriptionPatch {
            stripe_price_id: subscription.price_id().map(str::to_string),
            current_period_end: Some(period_end),
            status: Some(subscription.status.clone()),
        };

        self.update(&subscription.id, patch, ReconcileOutcome::Updated)
            .await
    }

    /// `customer.subscription.deleted`: soft termination, status only.
    async fn apply_cancellation(
        &self,
        subscription_id: &str,
    ) -> Result<ReconcileOutcome, BillingError> {
        self.update(
            subscription_id,
            SubscriptionPatch::cancellation(),
            ReconcileOutcome::Canceled,
        )
        .await
    }

    async fn update(
        &self,
        subscription_id: &str,
        patch: SubscriptionPatch,
        on_match: ReconcileOutcome,
    ) -> Result<ReconcileOutcome, BillingError> {
        let matched = self
            .store
            .update_by_subscription_id(subscription_id, patch)
            .await
            .map_err(|e| BillingError::Store(e.to_string()))?;

        if matched {
            Ok(on_match)
        } else {
            warn!(
                subscription_id = %subscription_id,
                "update for unknown subscription record, acknowledging"
            );
            Ok(ReconcileOutcome::SkippedUnknownRecord)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{MockPaymentProvider, MockSubscriptionStore};
    use crate::domain::billing::CANCELED_STATUS;
    use crate::ports::ProviderSubscription;
    use serde_json::json;

    const USER_ID: &str = "9f1c2e4a-1111-2222-3333-444455556666";

    fn handler(
        store: Arc<MockSubscriptionStore>,
        provider: Arc<MockPaymentProvider>,
    ) -> ReconcileEventHandler {
        ReconcileEventHandler::new(store, provider)
    }

    fn command(payload: serde_json::Value) -> ReconcileEventCommand {
        ReconcileEventCommand {
            payload: payload.to_string().into_bytes(),
            signature: "t=0,v1=mock".to_string(),
        }
    }

    fn envelope(event_type: &str, object: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "evt_test_1",
            "type": event_type,
            "created": 1704067200,
            "data": { "object": object },
            "livemode": false,
            "api_version": "2023-10-16"
        })
    }

    fn provider_subscription() -> ProviderSubscription {
        ProviderSubscription {
            id: "sub_123".to_string(),
            customer_id: "cus_123".to_string(),
            price_id: "price_professional".to_string(),
            status: "active".to_string(),
            current_period_end: 1735689600,
        }
    }

    fn subscription_object() -> serde_json::Value {
        json!({
            "id": "sub_123",
            "customer": "cus_123",
            "status": "active",
            "current_period_end": 1735689600,
            "items": { "data": [{ "price": { "id": "price_professional" } }] }
        })
    }

    #[tokio::test]
    async fn invalid_signature_writes_nothing() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());

        let result = handler(Arc::clone(&store), provider)
            .handle(ReconcileEventCommand {
                payload: b"{}".to_vec(),
                signature: "invalid".to_string(),
            })
            .await;

        assert!(matches!(result, Err(BillingError::InvalidSignature(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn checkout_completed_fetches_detail_and_creates_record() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());
        provider.insert_subscription(provider_subscription());

        let outcome = handler(Arc::clone(&store), Arc::clone(&provider))
            .handle(command(envelope(
                "checkout.session.completed",
                json!({
                    "id": "cs_1",
                    "customer": "cus_123",
                    "subscription": "sub_123",
                    "metadata": { "userId": USER_ID }
                }),
            )))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Created);
        assert_eq!(provider.retrievals(), 1);

        let created = store.created_subscriptions();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].user_id.to_string(), USER_ID);
        assert_eq!(created[0].stripe_subscription_id, "sub_123");
        assert_eq!(created[0].stripe_price_id, "price_professional");
        assert_eq!(created[0].status, "active");
        assert_eq!(created[0].current_period_end.timestamp(), 1735689600);
    }

    #[tokio::test]
    async fn checkout_completed_without_user_metadata_is_invalid() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());

        let result = handler(Arc::clone(&store), provider)
            .handle(command(envelope(
                "checkout.session.completed",
                json!({ "id": "cs_1", "subscription": "sub_123", "metadata": {} }),
            )))
            .await;

        assert!(matches!(result, Err(BillingError::InvalidRequest(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn checkout_completed_without_subscription_is_invalid() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());

        let result = handler(store, provider)
            .handle(command(envelope(
                "checkout.session.completed",
                json!({ "id": "cs_1", "metadata": { "userId": USER_ID } }),
            )))
            .await;

        assert!(matches!(result, Err(BillingError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn invoice_payment_refreshes_matching_record() {
        let store = Arc::new(MockSubscriptionStore::default());
        store.insert_subscription_id("sub_123");
        let provider = Arc::new(MockPaymentProvider::default());
        provider.insert_subscription(provider_subscription());

        let outcome = handler(Arc::clone(&store), provider)
            .handle(command(envelope(
                "invoice.payment_succeeded",
                json!({ "id": "in_1", "subscription": "sub_123" }),
            )))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Updated);
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "sub_123");
        assert_eq!(
            updates[0].1.stripe_price_id.as_deref(),
            Some("price_professional")
        );
        assert_eq!(updates[0].1.status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_ignored() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());

        let outcome = handler(Arc::clone(&store), Arc::clone(&provider))
            .handle(command(envelope(
                "invoice.payment_succeeded",
                json!({ "id": "in_1", "subscription": null }),
            )))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Ignored);
        assert_eq!(provider.retrievals(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn subscription_updated_applies_payload_without_fetch() {
        let store = Arc::new(MockSubscriptionStore::default());
        store.insert_subscription_id("sub_123");
        let provider = Arc::new(MockPaymentProvider::default());

        let outcome = handler(Arc::clone(&store), Arc::clone(&provider))
            .handle(command(envelope(
                "customer.subscription.updated",
                subscription_object(),
            )))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Updated);
        assert_eq!(provider.retrievals(), 0);
    }

    #[tokio::test]
    async fn update_for_unknown_record_is_acknowledged() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());

        let outcome = handler(Arc::clone(&store), provider)
            .handle(command(envelope(
                "customer.subscription.updated",
                subscription_object(),
            )))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::SkippedUnknownRecord);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn subscription_deleted_patches_status_only() {
        let store = Arc::new(MockSubscriptionStore::default());
        store.insert_subscription_id("sub_123");
        let provider = Arc::new(MockPaymentProvider::default());

        let outcome = handler(Arc::clone(&store), provider)
            .handle(command(envelope(
                "customer.subscription.deleted",
                subscription_object(),
            )))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Canceled);
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let patch = &updates[0].1;
        assert!(patch.stripe_price_id.is_none());
        assert!(patch.current_period_end.is_none());
        assert_eq!(patch.status.as_deref(), Some(CANCELED_STATUS));
    }

    #[tokio::test]
    async fn unrecognized_event_is_ignored() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());

        let outcome = handler(Arc::clone(&store), provider)
            .handle(command(envelope("customer.created", json!({}))))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Ignored);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_retryable() {
        let store = Arc::new(MockSubscriptionStore::default());
        store.insert_subscription_id("sub_123");
        store.fail_next_write("pool exhausted");
        let provider = Arc::new(MockPaymentProvider::default());

        let result = handler(store, provider)
            .handle(command(envelope(
                "customer.subscription.deleted",
                subscription_object(),
            )))
            .await;

        match result {
            Err(err) => assert!(err.is_retryable()),
            Ok(outcome) => panic!("expected store failure, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn provider_failure_during_renewal_is_retryable() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());
        // No seeded subscription: retrieval fails.

        let result = handler(store, provider)
            .handle(command(envelope(
                "invoice.payment_succeeded",
                json!({ "id": "in_1", "subscription": "sub_missing" }),
            )))
            .await;

        match result {
            Err(err) => assert!(err.is_retryable()),
            Ok(outcome) => panic!("expected provider failure, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn redelivered_checkout_event_converges() {
        let store = Arc::new(MockSubscriptionStore::default());
        let provider = Arc::new(MockPaymentProvider::default());
        provider.insert_subscription(provider_subscription());
        let handler = handler(Arc::clone(&store), Arc::clone(&provider));

        let cmd = command(envelope(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "customer": "cus_123",
                "subscription": "sub_123",
                "metadata": { "userId": USER_ID }
            }),
        ));

        let first = handler.handle(cmd.clone()).await.unwrap();
        let second = handler.handle(cmd).await.unwrap();

        assert_eq!(first, ReconcileOutcome::Created);
        assert_eq!(second, ReconcileOutcome::Created);
        let created = store.created_subscriptions();
        assert_eq!(created[0], created[1]);
    }
}
