//! Idempotent schema bootstrap.
//!
//! Every statement is safe to re-run: tables are created if missing and
//! columns added later in the schema's life are added with
//! `ADD COLUMN IF NOT EXISTS`, so older databases are upgraded in place.

use foody_core::error::Result;

use crate::{PostgresMarketStore, storage_error};

const STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS foody_restaurants (
        id TEXT PRIMARY KEY,
        api_key TEXT NOT NULL,
        title TEXT NOT NULL,
        phone TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    ",
    "ALTER TABLE foody_restaurants ADD COLUMN IF NOT EXISTS city TEXT",
    "ALTER TABLE foody_restaurants ADD COLUMN IF NOT EXISTS address TEXT",
    "ALTER TABLE foody_restaurants ADD COLUMN IF NOT EXISTS lat DOUBLE PRECISION",
    "ALTER TABLE foody_restaurants ADD COLUMN IF NOT EXISTS lon DOUBLE PRECISION",
    "CREATE INDEX IF NOT EXISTS idx_foody_restaurants_phone ON foody_restaurants(phone, created_at DESC)",
    r"
    CREATE TABLE IF NOT EXISTS foody_offers (
        id TEXT PRIMARY KEY,
        restaurant_id TEXT NOT NULL REFERENCES foody_restaurants(id),
        title TEXT NOT NULL,
        price_cents INT NOT NULL DEFAULT 0,
        qty_left INT NOT NULL DEFAULT 0,
        qty_total INT NOT NULL DEFAULT 0,
        expires_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT foody_offers_qty_check CHECK (qty_left >= 0 AND qty_left <= qty_total)
    )
    ",
    "ALTER TABLE foody_offers ADD COLUMN IF NOT EXISTS description TEXT",
    "ALTER TABLE foody_offers ADD COLUMN IF NOT EXISTS original_price_cents INT",
    "ALTER TABLE foody_offers ADD COLUMN IF NOT EXISTS archived_at TIMESTAMPTZ",
    "ALTER TABLE foody_offers ADD COLUMN IF NOT EXISTS photo_url TEXT",
    "CREATE INDEX IF NOT EXISTS idx_foody_offers_restaurant ON foody_offers(restaurant_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_foody_offers_active ON foody_offers(created_at DESC) WHERE archived_at IS NULL",
    r"
    CREATE TABLE IF NOT EXISTS foody_reservations (
        id TEXT PRIMARY KEY,
        offer_id TEXT NOT NULL REFERENCES foody_offers(id),
        restaurant_id TEXT NOT NULL REFERENCES foody_restaurants(id),
        code TEXT NOT NULL UNIQUE,
        qty INT NOT NULL DEFAULT 1 CHECK (qty > 0),
        status TEXT NOT NULL DEFAULT 'reserved',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    ",
    "ALTER TABLE foody_reservations ADD COLUMN IF NOT EXISTS canceled_at TIMESTAMPTZ",
    "ALTER TABLE foody_reservations ADD COLUMN IF NOT EXISTS redeemed_at TIMESTAMPTZ",
    "CREATE INDEX IF NOT EXISTS idx_foody_reservations_restaurant ON foody_reservations(restaurant_id)",
];

impl PostgresMarketStore {
    /// Create or upgrade the marketplace tables.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if any DDL statement fails.
    pub async fn migrate(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(storage_error("failed to acquire connection for migrations"))?;

        for statement in STATEMENTS {
            sqlx::query(statement)
                .execute(&mut *conn)
                .await
                .map_err(storage_error("migration statement failed"))?;
        }

        tracing::info!(statements = STATEMENTS.len(), "schema bootstrap complete");
        Ok(())
    }
}
