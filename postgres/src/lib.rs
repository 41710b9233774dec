//! `PostgreSQL` storage backend for the Foody marketplace.
//!
//! [`PostgresMarketStore`] implements every storage port from `foody-core`
//! over a shared [`PgPool`]. Inventory-touching operations run in a single
//! transaction per call and lock the affected rows with
//! `SELECT ... FOR UPDATE`, always reservation first, then offer.
//!
//! # Example
//!
//! ```no_run
//! use foody_postgres::PostgresMarketStore;
//! use sqlx::postgres::PgPoolOptions;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPoolOptions::new()
//!     .max_connections(5)
//!     .connect("postgres://localhost/foody")
//!     .await?;
//! let store = PostgresMarketStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod merchants;
mod offers;
mod reservations;
mod rows;
mod schema;

use foody_core::error::MarketError;
use foody_core::store::{MarketStore, StoreFuture};
use sqlx::PgPool;

/// `PostgreSQL`-backed marketplace store.
#[derive(Clone, Debug)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl MarketStore for PostgresMarketStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(storage_error("ping failed"))?;
            Ok(())
        })
    }
}

/// Log a driver error and turn it into [`MarketError::Internal`].
pub(crate) fn storage_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> MarketError {
    move |error| {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                tracing::error!(error = %error, "{context}: duplicate key");
                return MarketError::internal(format!("{context}: duplicate key"));
            }
        }
        tracing::error!(error = %error, "{context}");
        MarketError::internal(context)
    }
}
