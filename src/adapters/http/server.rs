//! Top-level router assembly.
//!
//! Mounts the billing module under `/api` and applies the shared middleware
//! stack: request ids, tracing, CORS, and a request timeout.

use std::time::Duration;

use axum::Router;
use http::HeaderName;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::billing::{billing_router, BillingAppState};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the full application router with middleware applied.
pub fn app(state: BillingAppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api", billing_router())
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
