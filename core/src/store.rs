//! Storage ports.
//!
//! Backends implement these traits over their own persistence. Operations
//! that touch inventory must be atomic per call: the reservation state change
//! and the matching quantity change commit together or not at all, and
//! concurrent calls on the same offer serialize.
//!
//! # Dyn Compatibility
//!
//! Methods return boxed futures instead of using `async fn` so the service
//! can hold an `Arc<dyn MarketStore>`.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

use crate::catalog::CatalogEntry;
use crate::error::Result;
use crate::reservation::CancelScope;
use crate::types::{
    Offer, OfferId, OfferStatusFilter, RedemptionCode, Reservation, ReservationId, Restaurant,
    RestaurantId,
};

/// Boxed future returned by every port method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Merchant accounts.
pub trait MerchantDirectory: Send + Sync {
    /// Persist a newly registered account.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure or id collision.
    fn insert_restaurant(&self, restaurant: Restaurant) -> StoreFuture<'_, ()>;

    /// Look up an account by id.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    fn find_restaurant(&self, id: &RestaurantId) -> StoreFuture<'_, Option<Restaurant>>;

    /// Overwrite the mutable profile fields of an existing account.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is gone, `Internal` on storage failure.
    fn update_restaurant(&self, restaurant: Restaurant) -> StoreFuture<'_, ()>;

    /// Most recently registered account with this phone.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    fn find_restaurant_by_phone(&self, phone: &str) -> StoreFuture<'_, Option<Restaurant>>;
}

/// Offer records.
pub trait OfferRepository: Send + Sync {
    /// Persist a new offer.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure or id collision.
    fn insert_offer(&self, offer: Offer) -> StoreFuture<'_, ()>;

    /// Look up an offer by id.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    fn find_offer(&self, id: &OfferId) -> StoreFuture<'_, Option<Offer>>;

    /// A merchant's offers matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    fn restaurant_offers(
        &self,
        restaurant_id: &RestaurantId,
        filter: OfferStatusFilter,
    ) -> StoreFuture<'_, Vec<Offer>>;

    /// Stamp `archived_at` on an offer owned by `restaurant_id`.
    ///
    /// Archiving twice keeps the first timestamp. Returns the offer as stored.
    ///
    /// # Errors
    ///
    /// `NotFound` when the offer is missing or owned by someone else.
    fn archive_offer(
        &self,
        restaurant_id: &RestaurantId,
        offer_id: &OfferId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Offer>;

    /// Offers that may be redeemable at `now`, joined with their restaurant,
    /// newest first. With `scan_limit` only that many newest candidates are
    /// returned.
    ///
    /// Backends may pre-filter; [`crate::catalog::list`] applies the exact
    /// predicate again.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    fn catalog_entries(
        &self,
        now: DateTime<Utc>,
        scan_limit: Option<usize>,
    ) -> StoreFuture<'_, Vec<CatalogEntry>>;
}

/// Atomic quantity changes on a single offer.
pub trait InventoryLedger: Send + Sync {
    /// Apply [`crate::ledger::reserve`] atomically; returns the new `qty_left`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InsufficientQuantity`, `InvalidInput` per the ledger
    /// rules, `Internal` on storage failure.
    fn reserve(&self, offer_id: &OfferId, qty: u32, now: DateTime<Utc>) -> StoreFuture<'_, u32>;

    /// Apply [`crate::ledger::release`] atomically; returns the new `qty_left`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the offer does not exist, `Internal` on storage failure.
    fn release(&self, offer_id: &OfferId, qty: u32) -> StoreFuture<'_, u32>;
}

/// Reservation records and their transitions.
pub trait ReservationRepository: Send + Sync {
    /// Reserve `qty` from the offer and persist a `reserved` reservation in
    /// one atomic unit.
    ///
    /// # Errors
    ///
    /// Ledger errors from [`InventoryLedger::reserve`]; `Internal` on storage
    /// failure or code collision.
    fn open_reservation(
        &self,
        offer_id: &OfferId,
        qty: u32,
        id: ReservationId,
        code: RedemptionCode,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation>;

    /// Cancel the reservation with `code` visible to `scope` and release its
    /// quantity, atomically.
    ///
    /// # Errors
    ///
    /// `NotFound` when no visible reservation has the code; `InvalidState`
    /// when it is not `reserved`.
    fn cancel_reservation(
        &self,
        code: &RedemptionCode,
        scope: &CancelScope,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation>;

    /// Mark the merchant's reservation with `code` as redeemed.
    ///
    /// # Errors
    ///
    /// `NotFound` when no reservation of `restaurant_id` has the code;
    /// `InvalidState` when it is not `reserved`.
    fn redeem_reservation(
        &self,
        code: &RedemptionCode,
        restaurant_id: &RestaurantId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation>;

    /// Look up a reservation by code.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    fn find_reservation(&self, code: &RedemptionCode) -> StoreFuture<'_, Option<Reservation>>;
}

/// Everything the marketplace service needs from storage.
pub trait MarketStore:
    MerchantDirectory + OfferRepository + InventoryLedger + ReservationRepository
{
    /// Cheap liveness probe of the backend.
    ///
    /// # Errors
    ///
    /// `Internal` when the backend is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
