//! Foody marketplace server: configuration, storage wiring and metrics.

pub mod config;
pub mod metrics;

use std::sync::Arc;

use foody_core::Marketplace;
use foody_postgres::PostgresMarketStore;
use foody_web::{AppState, RouterConfig};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::{Config, PostgresConfig};

/// Open the connection pool, applying the statement timeout on every
/// connection.
///
/// # Errors
///
/// Returns the driver error when the database cannot be reached.
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool, sqlx::Error> {
    let statement_timeout_ms = config.statement_timeout_ms();
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .idle_timeout(Some(config.idle_timeout()))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let sql = format!("SET statement_timeout = {statement_timeout_ms}");
                sqlx::query(&sql).execute(conn).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}

/// Build the HTTP application state over a `PostgreSQL` store.
#[must_use]
pub fn app_state(store: PostgresMarketStore, config: &Config) -> AppState {
    AppState::new(Marketplace::new(Arc::new(store)))
        .with_recovery_secret(config.server.recovery_secret.clone())
}

/// HTTP-level settings derived from the configuration.
#[must_use]
pub fn router_config(config: &Config) -> RouterConfig {
    RouterConfig {
        cors_origins: config.server.cors_origins.clone(),
        request_timeout: Duration::from_secs(config.server.request_timeout),
    }
}
