//! Service entry point: load configuration, connect the pool, wire the
//! adapters, and serve the router.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use launchbase::adapters::http::{app, BillingAppState};
use launchbase::adapters::{PostgresSubscriptionStore, StripeClient, StripeConfig};
use launchbase::application::RedirectUrls;
use launchbase::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "starting launchbase"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let stripe_client = StripeClient::new(StripeConfig::new(
        config.payment.stripe_api_key.clone(),
        config.payment.stripe_webhook_secret.clone(),
    ));

    let state = BillingAppState {
        subscription_store: Arc::new(PostgresSubscriptionStore::new(pool)),
        payment_provider: Arc::new(stripe_client),
        redirect_urls: RedirectUrls::from_base(&config.payment.public_base_url),
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
    axum::serve(listener, app(state, request_timeout)).await?;

    Ok(())
}
