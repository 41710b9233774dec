//! Reservation lifecycle over `foody_reservations`.
//!
//! Each transition runs in one transaction. The reservation row is locked
//! before the offer row, the same order every operation uses.

use chrono::{DateTime, Utc};
use foody_core::error::{MarketError, Result};
use foody_core::ledger;
use foody_core::reservation::CancelScope;
use foody_core::store::{ReservationRepository, StoreFuture};
use foody_core::types::{OfferId, RedemptionCode, Reservation, ReservationId, RestaurantId};
use sqlx::PgConnection;

use crate::offers::{lock_offer, store_qty_left};
use crate::rows::{ReservationRow, qty_to_db, reservation_columns};
use crate::{PostgresMarketStore, storage_error};

/// Lock the reservation with `code`, optionally restricted to one merchant.
async fn lock_reservation(
    conn: &mut PgConnection,
    code: &RedemptionCode,
    restaurant_id: Option<&RestaurantId>,
) -> Result<Reservation> {
    let row: Option<ReservationRow> = sqlx::query_as(concat!(
        "SELECT ",
        reservation_columns!(),
        " FROM foody_reservations",
        " WHERE code = $1 AND ($2::TEXT IS NULL OR restaurant_id = $2)",
        " FOR UPDATE"
    ))
    .bind(code.as_str())
    .bind(restaurant_id.map(RestaurantId::as_str))
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_error("failed to lock reservation"))?;

    row.ok_or_else(|| MarketError::not_found("reservation", code.as_str()))?
        .try_into()
}

async fn store_transition(conn: &mut PgConnection, reservation: &Reservation) -> Result<()> {
    sqlx::query(
        "UPDATE foody_reservations
         SET status = $2, canceled_at = $3, redeemed_at = $4
         WHERE id = $1",
    )
    .bind(reservation.id.as_str())
    .bind(reservation.status.as_str())
    .bind(reservation.canceled_at)
    .bind(reservation.redeemed_at)
    .execute(&mut *conn)
    .await
    .map_err(storage_error("failed to update reservation"))?;
    Ok(())
}

impl ReservationRepository for PostgresMarketStore {
    fn open_reservation(
        &self,
        offer_id: &OfferId,
        qty: u32,
        id: ReservationId,
        code: RedemptionCode,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation> {
        let offer_id = offer_id.clone();
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(storage_error("failed to start transaction"))?;

            let mut offer = lock_offer(&mut tx, &offer_id).await?;
            ledger::reserve(&mut offer, qty, now)?;
            store_qty_left(&mut tx, &offer).await?;

            let reservation = Reservation::open(id, code, &offer, qty, now);
            sqlx::query(
                "INSERT INTO foody_reservations
                    (id, offer_id, restaurant_id, qty, code, status, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(reservation.id.as_str())
            .bind(reservation.offer_id.as_str())
            .bind(reservation.restaurant_id.as_str())
            .bind(qty_to_db(reservation.qty, "qty")?)
            .bind(reservation.code.as_str())
            .bind(reservation.status.as_str())
            .bind(reservation.created_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("failed to insert reservation"))?;

            tx.commit()
                .await
                .map_err(storage_error("failed to commit transaction"))?;
            Ok(reservation)
        })
    }

    fn cancel_reservation(
        &self,
        code: &RedemptionCode,
        scope: &CancelScope,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation> {
        let code = code.clone();
        let scope = scope.clone();
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(storage_error("failed to start transaction"))?;

            let merchant = match &scope {
                CancelScope::Holder => None,
                CancelScope::Merchant(restaurant_id) => Some(restaurant_id),
            };
            let mut reservation = lock_reservation(&mut tx, &code, merchant).await?;
            reservation.cancel(now)?;

            let mut offer = lock_offer(&mut tx, &reservation.offer_id).await?;
            ledger::release(&mut offer, reservation.qty);
            store_qty_left(&mut tx, &offer).await?;
            store_transition(&mut tx, &reservation).await?;

            tx.commit()
                .await
                .map_err(storage_error("failed to commit transaction"))?;
            Ok(reservation)
        })
    }

    fn redeem_reservation(
        &self,
        code: &RedemptionCode,
        restaurant_id: &RestaurantId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation> {
        let code = code.clone();
        let restaurant_id = restaurant_id.clone();
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(storage_error("failed to start transaction"))?;

            let mut reservation = lock_reservation(&mut tx, &code, Some(&restaurant_id)).await?;
            reservation.redeem(now)?;
            store_transition(&mut tx, &reservation).await?;

            tx.commit()
                .await
                .map_err(storage_error("failed to commit transaction"))?;
            Ok(reservation)
        })
    }

    fn find_reservation(&self, code: &RedemptionCode) -> StoreFuture<'_, Option<Reservation>> {
        let code = code.clone();
        Box::pin(async move {
            let row: Option<ReservationRow> = sqlx::query_as(concat!(
                "SELECT ",
                reservation_columns!(),
                " FROM foody_reservations WHERE code = $1"
            ))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("failed to load reservation"))?;
            row.map(Reservation::try_from).transpose()
        })
    }
}
