//! Shared mock port implementations for handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::{NewSubscription, ProviderEvent, SubscriptionPatch, UserAccount};
use crate::ports::{
    CheckoutSession, CheckoutSessionRequest, Customer, PaymentProvider, ProviderError,
    ProviderSubscription, StoreError, SubscriptionStore,
};

/// In-memory `SubscriptionStore` double.
#[derive(Default)]
pub struct MockSubscriptionStore {
    users: Mutex<Vec<UserAccount>>,
    known_subscription_ids: Mutex<Vec<String>>,
    created: Mutex<Vec<NewSubscription>>,
    updated: Mutex<Vec<(String, SubscriptionPatch)>>,
    fail_next_write: Mutex<Option<String>>,
}

impl MockSubscriptionStore {
    pub fn insert_user(&self, account: UserAccount) {
        self.users.lock().unwrap().push(account);
    }

    /// Register a subscription id so that updates against it report a match.
    pub fn insert_subscription_id(&self, id: &str) {
        self.known_subscription_ids
            .lock()
            .unwrap()
            .push(id.to_string());
    }

    pub fn fail_next_write(&self, message: &str) {
        *self.fail_next_write.lock().unwrap() = Some(message.to_string());
    }

    pub fn created_subscriptions(&self) -> Vec<NewSubscription> {
        self.created.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, SubscriptionPatch)> {
        self.updated.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.created.lock().unwrap().len() + self.updated.lock().unwrap().len()
    }

    fn take_failure(&self) -> Option<StoreError> {
        self.fail_next_write
            .lock()
            .unwrap()
            .take()
            .map(StoreError::Database)
    }
}

#[async_trait]
impl SubscriptionStore for MockSubscriptionStore {
    async fn create_subscription(&self, subscription: NewSubscription) -> Result<(), StoreError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.created.lock().unwrap().push(subscription);
        Ok(())
    }

    async fn update_by_subscription_id(
        &self,
        stripe_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<bool, StoreError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let matched = self
            .known_subscription_ids
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == stripe_subscription_id);
        if matched {
            self.updated
                .lock()
                .unwrap()
                .push((stripe_subscription_id.to_string(), patch));
        }
        Ok(matched)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}

/// `PaymentProvider` double.
///
/// `verify_event` treats the literal signature `"invalid"` as a failed
/// authenticity check and otherwise parses the payload directly, so tests
/// drive the reconciler with plain JSON fixtures.
#[derive(Default)]
pub struct MockPaymentProvider {
    customers: AtomicUsize,
    sessions: AtomicUsize,
    last_session_request: Mutex<Option<CheckoutSessionRequest>>,
    subscriptions: Mutex<Vec<ProviderSubscription>>,
    fail_next_session: Mutex<Option<String>>,
    retrieval_count: AtomicUsize,
}

impl MockPaymentProvider {
    pub fn customers_created(&self) -> usize {
        self.customers.load(Ordering::SeqCst)
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn retrievals(&self) -> usize {
        self.retrieval_count.load(Ordering::SeqCst)
    }

    pub fn last_session_request(&self) -> Option<CheckoutSessionRequest> {
        self.last_session_request.lock().unwrap().clone()
    }

    pub fn fail_next_session(&self, message: &str) {
        *self.fail_next_session.lock().unwrap() = Some(message.to_string());
    }

    /// Seed the subscription detail returned by `retrieve_subscription`.
    pub fn insert_subscription(&self, subscription: ProviderSubscription) {
        self.subscriptions.lock().unwrap().push(subscription);
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        email: &str,
        _name: Option<&str>,
    ) -> Result<Customer, ProviderError> {
        let n = self.customers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Customer {
            id: format!("cus_mock_{}", n),
            email: email.to_string(),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        if let Some(message) = self.fail_next_session.lock().unwrap().take() {
            return Err(ProviderError::Api {
                status: 500,
                message,
            });
        }
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_session_request.lock().unwrap() = Some(request);
        Ok(CheckoutSession {
            id: format!("cs_mock_{}", n),
            url: Some("https://checkout.example.com/pay".to_string()),
        })
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ProviderError> {
        self.retrieval_count.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned()
            .ok_or_else(|| ProviderError::Api {
                status: 404,
                message: format!("no such subscription: {}", subscription_id),
            })
    }

    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ProviderEvent, ProviderError> {
        if signature == "invalid" {
            return Err(ProviderError::InvalidEvent("signature mismatch".to_string()));
        }
        serde_json::from_slice(payload)
            .map_err(|e| ProviderError::InvalidEvent(format!("malformed envelope: {}", e)))
    }
}
