//! Provider webhook event types and classification.
//!
//! Events arrive as a generic envelope with a `type` tag and a polymorphic
//! `data.object`. Classification resolves the tag into a closed tagged union
//! with one variant per recognized event, plus an explicit `Unrecognized`
//! variant for everything else.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::BillingError;

/// Raw webhook event envelope as received from the provider.
///
/// Only fields relevant to reconciliation are captured; the rest of the
/// provider's event schema is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type tag (e.g. "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    /// Event payload containing the affected object.
    pub data: ProviderEventData,

    /// Whether this is a live mode event.
    pub livemode: bool,

    /// API version used to render this event.
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    /// The object that triggered the event (shape depends on the event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only on update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

/// Checkout session object carried by `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionData {
    /// Session identifier (cs_...).
    pub id: String,

    /// Provider customer attached to the session.
    pub customer: Option<String>,

    /// Subscription created by the session (subscription mode only).
    pub subscription: Option<String>,

    /// Metadata attached at session creation; carries the internal user id
    /// under [`USER_ID_METADATA_KEY`].
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Metadata key under which checkout initiation embeds the internal user id.
pub const USER_ID_METADATA_KEY: &str = "userId";

/// Invoice object carried by `invoice.payment_succeeded`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceData {
    /// Invoice identifier (in_...).
    pub id: String,

    /// Subscription the invoice bills, if any.
    pub subscription: Option<String>,
}

/// Subscription object carried by `customer.subscription.*` events and
/// returned by the provider's subscription retrieval call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionData {
    /// Subscription identifier (sub_...).
    pub id: String,

    /// Owning provider customer.
    pub customer: String,

    /// Provider-reported status (opaque string).
    pub status: String,

    /// End of the current billing period (Unix timestamp).
    pub current_period_end: i64,

    /// Subscription line items; the active price lives on the first item.
    #[serde(default)]
    pub items: SubscriptionItemList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionItemList {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItem {
    pub price: PriceData,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceData {
    pub id: String,
}

impl SubscriptionData {
    /// Identifier of the currently active price, taken from the first item.
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }

    /// Current period end as a UTC timestamp.
    pub fn period_end(&self) -> Result<DateTime<Utc>, BillingError> {
        DateTime::<Utc>::from_timestamp(self.current_period_end, 0).ok_or_else(|| {
            BillingError::InvalidRequest(format!(
                "current_period_end out of range: {}",
                self.current_period_end
            ))
        })
    }
}

/// A classified webhook event.
///
/// Closed union over the event tags the reconciler acts on. Anything else
/// resolves to `Unrecognized` and is acknowledged without a state change.
#[derive(Debug, Clone)]
pub enum BillingEvent {
    /// `checkout.session.completed` — first-time subscribe; creates a record.
    CheckoutCompleted(CheckoutSessionData),

    /// `invoice.payment_succeeded` — renewal; updates the matching record
    /// from freshly fetched subscription detail.
    InvoicePaymentSucceeded(InvoiceData),

    /// `customer.subscription.updated` — plan change; updates the matching
    /// record directly from the event payload.
    SubscriptionUpdated(SubscriptionData),

    /// `customer.subscription.deleted` — soft termination; status only.
    SubscriptionDeleted(SubscriptionData),

    /// Any other tag. No-op.
    Unrecognized { event_type: String },
}

impl BillingEvent {
    /// Resolve a verified envelope into a classified event.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidRequest` when a recognized tag carries a
    /// payload that does not match its expected shape.
    pub fn classify(event: &ProviderEvent) -> Result<Self, BillingError> {
        match event.event_type.as_str() {
            "checkout.session.completed" => {
                Ok(Self::CheckoutCompleted(deserialize_object(event)?))
            }
            "invoice.payment_succeeded" => {
                Ok(Self::InvoicePaymentSucceeded(deserialize_object(event)?))
            }
            "customer.subscription.updated" => {
                Ok(Self::SubscriptionUpdated(deserialize_object(event)?))
            }
            "customer.subscription.deleted" => {
                Ok(Self::SubscriptionDeleted(deserialize_object(event)?))
            }
            other => Ok(Self::Unrecognized {
                event_type: other.to_string(),
            }),
        }
    }
}

fn deserialize_object<T: serde::de::DeserializeOwned>(
    event: &ProviderEvent,
) -> Result<T, BillingError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        BillingError::InvalidRequest(format!(
            "malformed {} payload: {}",
            event.event_type, e
        ))
    })
}

#[cfg(test)]
pub(crate) fn test_event(event_type: &str, object: serde_json::Value) -> ProviderEvent {
    ProviderEvent {
        id: "evt_test_123".to_string(),
        event_type: event_type.to_string(),
        created: 1704067200,
        data: ProviderEventData {
            object,
            previous_attributes: None,
        },
        livemode: false,
        api_version: Some("2023-10-16".to_string()),
    }
}
