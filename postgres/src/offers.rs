//! Offer repository and inventory ledger over `foody_offers`.

use chrono::{DateTime, Utc};
use foody_core::catalog::CatalogEntry;
use foody_core::error::{MarketError, Result};
use foody_core::ledger;
use foody_core::store::{InventoryLedger, OfferRepository, StoreFuture};
use foody_core::types::{Offer, OfferId, OfferStatusFilter, RestaurantId};
use sqlx::PgConnection;

use crate::rows::{CatalogRow, OfferRow, cents_to_db, offer_columns, qty_to_db};
use crate::{PostgresMarketStore, storage_error};

/// Lock an offer row for the rest of the transaction.
pub(crate) async fn lock_offer(conn: &mut PgConnection, id: &OfferId) -> Result<Offer> {
    let row: Option<OfferRow> = sqlx::query_as(concat!(
        "SELECT ",
        offer_columns!(),
        " FROM foody_offers WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_error("failed to lock offer"))?;

    row.ok_or_else(|| MarketError::not_found("offer", id.as_str()))?
        .try_into()
}

/// Write back `qty_left` of a locked offer.
pub(crate) async fn store_qty_left(conn: &mut PgConnection, offer: &Offer) -> Result<()> {
    sqlx::query("UPDATE foody_offers SET qty_left = $2 WHERE id = $1")
        .bind(offer.id.as_str())
        .bind(qty_to_db(offer.qty_left, "qty_left")?)
        .execute(&mut *conn)
        .await
        .map_err(storage_error("failed to update offer quantity"))?;
    Ok(())
}

fn collect_offers(rows: Vec<OfferRow>) -> Result<Vec<Offer>> {
    rows.into_iter().map(Offer::try_from).collect()
}

impl OfferRepository for PostgresMarketStore {
    fn insert_offer(&self, offer: Offer) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let original_price_cents = offer
                .original_price_cents
                .map(|cents| cents_to_db(cents, "original_price_cents"))
                .transpose()?;

            sqlx::query(
                "INSERT INTO foody_offers
                    (id, restaurant_id, title, description, price_cents, original_price_cents,
                     qty_left, qty_total, expires_at, archived_at, photo_url, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(offer.id.as_str())
            .bind(offer.restaurant_id.as_str())
            .bind(&offer.title)
            .bind(&offer.description)
            .bind(cents_to_db(offer.price_cents, "price_cents")?)
            .bind(original_price_cents)
            .bind(qty_to_db(offer.qty_left, "qty_left")?)
            .bind(qty_to_db(offer.qty_total, "qty_total")?)
            .bind(offer.expires_at)
            .bind(offer.archived_at)
            .bind(&offer.photo_url)
            .bind(offer.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage_error("failed to insert offer"))?;
            Ok(())
        })
    }

    fn find_offer(&self, id: &OfferId) -> StoreFuture<'_, Option<Offer>> {
        let id = id.clone();
        Box::pin(async move {
            let row: Option<OfferRow> = sqlx::query_as(concat!(
                "SELECT ",
                offer_columns!(),
                " FROM foody_offers WHERE id = $1"
            ))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("failed to load offer"))?;
            row.map(Offer::try_from).transpose()
        })
    }

    fn restaurant_offers(
        &self,
        restaurant_id: &RestaurantId,
        filter: OfferStatusFilter,
    ) -> StoreFuture<'_, Vec<Offer>> {
        let restaurant_id = restaurant_id.clone();
        Box::pin(async move {
            let sql = match filter {
                OfferStatusFilter::Active => concat!(
                    "SELECT ",
                    offer_columns!(),
                    " FROM foody_offers WHERE restaurant_id = $1 AND archived_at IS NULL",
                    " ORDER BY created_at DESC"
                ),
                OfferStatusFilter::Archived => concat!(
                    "SELECT ",
                    offer_columns!(),
                    " FROM foody_offers WHERE restaurant_id = $1 AND archived_at IS NOT NULL",
                    " ORDER BY created_at DESC"
                ),
                OfferStatusFilter::All => concat!(
                    "SELECT ",
                    offer_columns!(),
                    " FROM foody_offers WHERE restaurant_id = $1 ORDER BY created_at DESC"
                ),
            };
            let rows: Vec<OfferRow> = sqlx::query_as(sql)
                .bind(restaurant_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error("failed to list restaurant offers"))?;
            collect_offers(rows)
        })
    }

    fn archive_offer(
        &self,
        restaurant_id: &RestaurantId,
        offer_id: &OfferId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Offer> {
        let restaurant_id = restaurant_id.clone();
        let offer_id = offer_id.clone();
        Box::pin(async move {
            let row: Option<OfferRow> = sqlx::query_as(concat!(
                "UPDATE foody_offers SET archived_at = COALESCE(archived_at, $3)",
                " WHERE id = $1 AND restaurant_id = $2 RETURNING ",
                offer_columns!()
            ))
            .bind(offer_id.as_str())
            .bind(restaurant_id.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("failed to archive offer"))?;

            row.ok_or_else(|| MarketError::not_found("offer", offer_id.as_str()))?
                .try_into()
        })
    }

    fn catalog_entries(
        &self,
        now: DateTime<Utc>,
        scan_limit: Option<usize>,
    ) -> StoreFuture<'_, Vec<CatalogEntry>> {
        // LIMIT NULL reads everything.
        let scan_limit = scan_limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));
        Box::pin(async move {
            let rows: Vec<CatalogRow> = sqlx::query_as(
                "SELECT o.id, o.restaurant_id, o.title, o.description, o.price_cents,
                        o.original_price_cents, o.qty_left, o.qty_total, o.expires_at,
                        o.archived_at, o.photo_url, o.created_at,
                        r.title AS r_title, r.phone AS r_phone, r.city AS r_city,
                        r.address AS r_address, r.lat AS r_lat, r.lon AS r_lon
                 FROM foody_offers o
                 JOIN foody_restaurants r ON r.id = o.restaurant_id
                 WHERE o.archived_at IS NULL
                   AND (o.expires_at IS NULL OR o.expires_at > $1)
                   AND o.qty_left > 0
                 ORDER BY o.created_at DESC, o.id DESC
                 LIMIT $2",
            )
            .bind(now)
            .bind(scan_limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("failed to load catalog"))?;

            rows.into_iter().map(CatalogEntry::try_from).collect()
        })
    }
}

impl InventoryLedger for PostgresMarketStore {
    fn reserve(&self, offer_id: &OfferId, qty: u32, now: DateTime<Utc>) -> StoreFuture<'_, u32> {
        let offer_id = offer_id.clone();
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(storage_error("failed to start transaction"))?;

            let mut offer = lock_offer(&mut tx, &offer_id).await?;
            let qty_left = ledger::reserve(&mut offer, qty, now)?;
            store_qty_left(&mut tx, &offer).await?;

            tx.commit()
                .await
                .map_err(storage_error("failed to commit transaction"))?;
            Ok(qty_left)
        })
    }

    fn release(&self, offer_id: &OfferId, qty: u32) -> StoreFuture<'_, u32> {
        let offer_id = offer_id.clone();
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(storage_error("failed to start transaction"))?;

            let mut offer = lock_offer(&mut tx, &offer_id).await?;
            let qty_left = ledger::release(&mut offer, qty);
            store_qty_left(&mut tx, &offer).await?;

            tx.commit()
                .await
                .map_err(storage_error("failed to commit transaction"))?;
            Ok(qty_left)
        })
    }
}
