//! In-memory marketplace store.
//!
//! All state lives behind one mutex; every port call takes the lock, runs
//! the core rules synchronously and releases it before returning a ready
//! future. That gives each call the same all-or-nothing, serialized
//! semantics as a row-locking transaction.

use chrono::{DateTime, Utc};
use foody_core::catalog::CatalogEntry;
use foody_core::error::{MarketError, Result};
use foody_core::ledger;
use foody_core::reservation::CancelScope;
use foody_core::store::{
    InventoryLedger, MarketStore, MerchantDirectory, OfferRepository, ReservationRepository,
    StoreFuture,
};
use foody_core::types::{
    Offer, OfferId, OfferStatusFilter, RedemptionCode, Reservation, ReservationId,
    ReservationStatus, Restaurant, RestaurantId,
};
use std::collections::HashMap;
use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    restaurants: HashMap<RestaurantId, Restaurant>,
    offers: HashMap<OfferId, Offer>,
    reservations: HashMap<RedemptionCode, Reservation>,
}

impl State {
    fn offer_mut(&mut self, id: &OfferId) -> Result<&mut Offer> {
        self.offers
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("offer", id.as_str()))
    }
}

/// In-memory implementation of every storage port.
///
/// ```
/// use foody_testing::InMemoryMarketStore;
/// use foody_core::Marketplace;
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryMarketStore::new());
/// let _market = Marketplace::new(store.clone());
/// assert_eq!(store.offer_count(), 0);
/// ```
#[derive(Debug)]
pub struct InMemoryMarketStore {
    state: Mutex<State>,
    available: AtomicBool,
}

impl Default for InMemoryMarketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMarketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away; every call then fails `Internal`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored offers.
    #[must_use]
    pub fn offer_count(&self) -> usize {
        self.lock().map_or(0, |state| state.offers.len())
    }

    /// Sum of quantities held by `reserved` reservations against an offer.
    #[must_use]
    pub fn held_quantity(&self, offer_id: &OfferId) -> u32 {
        self.lock().map_or(0, |state| {
            state
                .reservations
                .values()
                .filter(|r| r.offer_id == *offer_id && !r.status.is_terminal())
                .map(|r| r.qty)
                .sum()
        })
    }

    /// Sum of quantities of `redeemed` reservations against an offer.
    #[must_use]
    pub fn redeemed_quantity(&self, offer_id: &OfferId) -> u32 {
        self.lock().map_or(0, |state| {
            state
                .reservations
                .values()
                .filter(|r| r.offer_id == *offer_id && r.status == ReservationStatus::Redeemed)
                .map(|r| r.qty)
                .sum()
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(MarketError::internal("store unavailable"));
        }
        self.state
            .lock()
            .map_err(|_| MarketError::internal("store lock poisoned"))
    }

    fn run<T: Send + 'static>(
        &self,
        op: impl FnOnce(&mut State) -> Result<T>,
    ) -> StoreFuture<'_, T> {
        let result = self.lock().and_then(|mut state| op(&mut state));
        Box::pin(future::ready(result))
    }
}

impl MerchantDirectory for InMemoryMarketStore {
    fn insert_restaurant(&self, restaurant: Restaurant) -> StoreFuture<'_, ()> {
        self.run(move |state| {
            if state.restaurants.contains_key(&restaurant.id) {
                return Err(MarketError::internal("duplicate restaurant id"));
            }
            state.restaurants.insert(restaurant.id.clone(), restaurant);
            Ok(())
        })
    }

    fn find_restaurant(&self, id: &RestaurantId) -> StoreFuture<'_, Option<Restaurant>> {
        self.run(|state| Ok(state.restaurants.get(id).cloned()))
    }

    fn update_restaurant(&self, restaurant: Restaurant) -> StoreFuture<'_, ()> {
        self.run(move |state| match state.restaurants.get_mut(&restaurant.id) {
            Some(stored) => {
                *stored = restaurant;
                Ok(())
            }
            None => Err(MarketError::not_found("restaurant", restaurant.id.as_str())),
        })
    }

    fn find_restaurant_by_phone(&self, phone: &str) -> StoreFuture<'_, Option<Restaurant>> {
        self.run(|state| {
            Ok(state
                .restaurants
                .values()
                .filter(|r| r.phone.as_deref() == Some(phone))
                .max_by_key(|r| r.created_at)
                .cloned())
        })
    }
}

impl OfferRepository for InMemoryMarketStore {
    fn insert_offer(&self, offer: Offer) -> StoreFuture<'_, ()> {
        self.run(move |state| {
            if state.offers.contains_key(&offer.id) {
                return Err(MarketError::internal("duplicate offer id"));
            }
            state.offers.insert(offer.id.clone(), offer);
            Ok(())
        })
    }

    fn find_offer(&self, id: &OfferId) -> StoreFuture<'_, Option<Offer>> {
        self.run(|state| Ok(state.offers.get(id).cloned()))
    }

    fn restaurant_offers(
        &self,
        restaurant_id: &RestaurantId,
        filter: OfferStatusFilter,
    ) -> StoreFuture<'_, Vec<Offer>> {
        self.run(|state| {
            let mut offers: Vec<Offer> = state
                .offers
                .values()
                .filter(|o| o.restaurant_id == *restaurant_id && filter.admits(o))
                .cloned()
                .collect();
            offers.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });
            Ok(offers)
        })
    }

    fn archive_offer(
        &self,
        restaurant_id: &RestaurantId,
        offer_id: &OfferId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Offer> {
        self.run(|state| match state.offers.get_mut(offer_id) {
            Some(offer) if offer.restaurant_id == *restaurant_id => {
                offer.archived_at.get_or_insert(now);
                Ok(offer.clone())
            }
            _ => Err(MarketError::not_found("offer", offer_id.as_str())),
        })
    }

    fn catalog_entries(
        &self,
        now: DateTime<Utc>,
        scan_limit: Option<usize>,
    ) -> StoreFuture<'_, Vec<CatalogEntry>> {
        self.run(|state| {
            let mut entries: Vec<CatalogEntry> = state
                .offers
                .values()
                .filter(|offer| offer.is_redeemable(now))
                .filter_map(|offer| {
                    let restaurant = state.restaurants.get(&offer.restaurant_id)?;
                    Some(CatalogEntry {
                        offer: offer.clone(),
                        restaurant: restaurant.profile(),
                    })
                })
                .collect();
            entries.sort_by(|a, b| {
                b.offer
                    .created_at
                    .cmp(&a.offer.created_at)
                    .then_with(|| b.offer.id.cmp(&a.offer.id))
            });
            if let Some(max) = scan_limit {
                entries.truncate(max);
            }
            Ok(entries)
        })
    }
}

impl InventoryLedger for InMemoryMarketStore {
    fn reserve(&self, offer_id: &OfferId, qty: u32, now: DateTime<Utc>) -> StoreFuture<'_, u32> {
        self.run(|state| ledger::reserve(state.offer_mut(offer_id)?, qty, now))
    }

    fn release(&self, offer_id: &OfferId, qty: u32) -> StoreFuture<'_, u32> {
        self.run(|state| Ok(ledger::release(state.offer_mut(offer_id)?, qty)))
    }
}

impl ReservationRepository for InMemoryMarketStore {
    fn open_reservation(
        &self,
        offer_id: &OfferId,
        qty: u32,
        id: ReservationId,
        code: RedemptionCode,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation> {
        self.run(move |state| {
            if state.reservations.contains_key(&code)
                || state.reservations.values().any(|r| r.id == id)
            {
                return Err(MarketError::internal("duplicate reservation id or code"));
            }
            let offer = state.offer_mut(offer_id)?;
            ledger::reserve(offer, qty, now)?;
            let reservation = Reservation::open(id, code, offer, qty, now);
            state
                .reservations
                .insert(reservation.code.clone(), reservation.clone());
            Ok(reservation)
        })
    }

    fn cancel_reservation(
        &self,
        code: &RedemptionCode,
        scope: &CancelScope,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation> {
        self.run(|state| {
            let mut reservation = state
                .reservations
                .get(code)
                .filter(|r| scope.admits(r))
                .cloned()
                .ok_or_else(|| MarketError::not_found("reservation", code.as_str()))?;
            reservation.cancel(now)?;

            // Validate both sides before mutating either.
            let offer = state.offer_mut(&reservation.offer_id)?;
            ledger::release(offer, reservation.qty);
            state
                .reservations
                .insert(reservation.code.clone(), reservation.clone());
            Ok(reservation)
        })
    }

    fn redeem_reservation(
        &self,
        code: &RedemptionCode,
        restaurant_id: &RestaurantId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Reservation> {
        self.run(|state| {
            let reservation = state
                .reservations
                .get_mut(code)
                .filter(|r| r.restaurant_id == *restaurant_id)
                .ok_or_else(|| MarketError::not_found("reservation", code.as_str()))?;
            reservation.redeem(now)?;
            Ok(reservation.clone())
        })
    }

    fn find_reservation(&self, code: &RedemptionCode) -> StoreFuture<'_, Option<Reservation>> {
        self.run(|state| Ok(state.reservations.get(code).cloned()))
    }
}

impl MarketStore for InMemoryMarketStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        self.run(|_| Ok(()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_clock;
    use foody_core::environment::Clock;
    use foody_core::types::ApiKey;

    fn seeded(qty: u32) -> (InMemoryMarketStore, DateTime<Utc>) {
        let now = test_clock().now();
        let store = InMemoryMarketStore::new();
        let mut state = store.state.lock().unwrap();
        state.restaurants.insert(
            RestaurantId::new("RID_1"),
            Restaurant {
                id: RestaurantId::new("RID_1"),
                api_key: ApiKey::new("KEY_1"),
                title: "Deli".to_string(),
                phone: None,
                city: None,
                address: None,
                lat: None,
                lon: None,
                created_at: now,
            },
        );
        state.offers.insert(
            OfferId::new("OFF_1"),
            Offer {
                id: OfferId::new("OFF_1"),
                restaurant_id: RestaurantId::new("RID_1"),
                title: "Sandwiches".to_string(),
                description: None,
                price_cents: 500,
                original_price_cents: None,
                qty_left: qty,
                qty_total: qty,
                expires_at: None,
                archived_at: None,
                photo_url: None,
                created_at: now,
            },
        );
        drop(state);
        (store, now)
    }

    #[tokio::test]
    async fn catalog_scan_keeps_newest_candidates() {
        let (store, now) = seeded(3);
        {
            let mut state = store.state.lock().unwrap();
            let mut newer = state.offers[&OfferId::new("OFF_1")].clone();
            newer.id = OfferId::new("OFF_2");
            newer.created_at = now + chrono::Duration::minutes(1);
            state.offers.insert(newer.id.clone(), newer);
        }

        assert_eq!(store.catalog_entries(now, None).await.unwrap().len(), 2);
        let newest = store.catalog_entries(now, Some(1)).await.unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].offer.id.as_str(), "OFF_2");
    }

    #[tokio::test]
    async fn open_and_cancel_round_trip_stock() {
        let (store, now) = seeded(3);
        let offer_id = OfferId::new("OFF_1");
        let reservation = store
            .open_reservation(
                &offer_id,
                2,
                ReservationId::new("RSV_1"),
                RedemptionCode::new("RES_1"),
                now,
            )
            .await
            .unwrap();
        assert_eq!(store.held_quantity(&offer_id), 2);

        let canceled = store
            .cancel_reservation(&reservation.code, &CancelScope::Holder, now)
            .await
            .unwrap();
        assert_eq!(canceled.status, ReservationStatus::Canceled);
        assert_eq!(store.held_quantity(&offer_id), 0);
        assert_eq!(store.find_offer(&offer_id).await.unwrap().unwrap().qty_left, 3);
    }

    #[tokio::test]
    async fn duplicate_code_is_internal() {
        let (store, now) = seeded(3);
        let offer_id = OfferId::new("OFF_1");
        store
            .open_reservation(
                &offer_id,
                1,
                ReservationId::new("RSV_1"),
                RedemptionCode::new("RES_1"),
                now,
            )
            .await
            .unwrap();
        let err = store
            .open_reservation(
                &offer_id,
                1,
                ReservationId::new("RSV_2"),
                RedemptionCode::new("RES_1"),
                now,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert_eq!(store.find_offer(&offer_id).await.unwrap().unwrap().qty_left, 2);
    }

    #[tokio::test]
    async fn unavailable_store_fails_internal() {
        let (store, _) = seeded(1);
        store.set_available(false);
        assert_eq!(store.ping().await.unwrap_err().kind(), "internal");
        store.set_available(true);
        store.ping().await.unwrap();
    }
}
