//! The marketplace service.
//!
//! [`Marketplace`] is the single entry point used by the HTTP layer. It
//! authorizes merchants, issues identifiers, validates input and delegates
//! atomic work to the [`MarketStore`].

use std::fmt;
use std::sync::Arc;

use metrics::{counter, histogram};

use crate::catalog::{self, CatalogQuery, ListedOffer};
use crate::environment::{Clock, SystemClock};
use crate::error::{MarketError, Result};
use crate::issuer::{RandomIssuer, TokenIssuer, TokenKind};
use crate::reservation::{CancelScope, parse_code};
use crate::store::MarketStore;
use crate::types::{
    ApiKey, NewRestaurant, Offer, OfferDraft, OfferId, OfferStatusFilter, ProfileUpdate,
    RedemptionCode, Reservation, ReservationId, Restaurant, RestaurantId, RestaurantProfile,
};

/// Credentials handed back on registration and key recovery.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Credentials {
    /// Account id.
    pub restaurant_id: RestaurantId,
    /// Account key.
    pub api_key: ApiKey,
}

impl From<&Restaurant> for Credentials {
    fn from(restaurant: &Restaurant) -> Self {
        Self {
            restaurant_id: restaurant.id.clone(),
            api_key: restaurant.api_key.clone(),
        }
    }
}

/// Marketplace operations over an injected store, clock and issuer.
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn MarketStore>,
    clock: Arc<dyn Clock>,
    issuer: Arc<dyn TokenIssuer>,
}

impl fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marketplace").finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Create a service with the system clock and random issuer.
    #[must_use]
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            issuer: Arc::new(RandomIssuer),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the token issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.issuer = issuer;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn MarketStore> {
        &self.store
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Merchants
    // ------------------------------------------------------------------

    /// Register a merchant account and return its credentials.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the title is blank; `Internal` on storage failure.
    #[tracing::instrument(skip(self, details), fields(title = %details.title))]
    pub async fn register(&self, details: NewRestaurant) -> Result<Credentials> {
        let details = details.normalized()?;
        let restaurant = Restaurant {
            id: RestaurantId::new(self.issuer.issue(TokenKind::Restaurant)),
            api_key: ApiKey::new(self.issuer.issue(TokenKind::ApiKey)),
            title: details.title,
            phone: details.phone,
            city: details.city,
            address: details.address,
            lat: details.lat,
            lon: details.lon,
            created_at: self.clock.now(),
        };
        let credentials = Credentials::from(&restaurant);
        self.store.insert_restaurant(restaurant).await?;

        counter!("foody_merchants_registered_total").increment(1);
        tracing::info!(restaurant_id = %credentials.restaurant_id, "merchant registered");
        Ok(credentials)
    }

    /// Check that `api_key` authorizes `restaurant_id`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the key is blank, the account does not exist, or
    /// the key does not match.
    pub async fn authorize(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
    ) -> Result<Restaurant> {
        if restaurant_id.as_str().is_empty() || api_key.is_empty() {
            return Err(MarketError::Unauthorized);
        }
        match self.store.find_restaurant(restaurant_id).await? {
            Some(restaurant) if restaurant.api_key.matches(api_key) => Ok(restaurant),
            _ => {
                tracing::debug!(%restaurant_id, "merchant authorization rejected");
                Err(MarketError::Unauthorized)
            }
        }
    }

    /// The merchant's own profile.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials.
    pub async fn profile(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
    ) -> Result<RestaurantProfile> {
        Ok(self.authorize(restaurant_id, api_key).await?.profile())
    }

    /// Update the merchant's profile and return the stored result.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials; `Internal` on storage failure.
    #[tracing::instrument(skip(self, api_key, update))]
    pub async fn update_profile(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
        update: ProfileUpdate,
    ) -> Result<RestaurantProfile> {
        let mut restaurant = self.authorize(restaurant_id, api_key).await?;
        update.normalized().apply_to(&mut restaurant);
        let profile = restaurant.profile();
        self.store.update_restaurant(restaurant).await?;
        Ok(profile)
    }

    /// Key recovery by phone: the newest account registered with it.
    ///
    /// Gating on a recovery secret is the caller's job.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the phone is blank; `NotFound` when no account
    /// uses it.
    #[tracing::instrument(skip(self, phone))]
    pub async fn recover_by_phone(&self, phone: &str) -> Result<Restaurant> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(MarketError::invalid_input("phone required"));
        }
        let restaurant = self
            .store
            .find_restaurant_by_phone(phone)
            .await?
            .ok_or_else(|| MarketError::not_found("restaurant", "by phone"))?;
        tracing::warn!(restaurant_id = %restaurant.id, "merchant key recovered");
        Ok(restaurant)
    }

    // ------------------------------------------------------------------
    // Offers
    // ------------------------------------------------------------------

    /// Create an offer for the merchant.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials; `InvalidInput` when the draft
    /// violates an offer invariant.
    #[tracing::instrument(skip(self, api_key, draft))]
    pub async fn create_offer(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
        draft: OfferDraft,
    ) -> Result<Offer> {
        let restaurant = self.authorize(restaurant_id, api_key).await?;
        let offer = Offer::create(
            OfferId::new(self.issuer.issue(TokenKind::Offer)),
            restaurant.id,
            draft,
            self.clock.now(),
        )?;
        self.store.insert_offer(offer.clone()).await?;

        counter!("foody_offers_created_total").increment(1);
        tracing::info!(offer_id = %offer.id, qty_total = offer.qty_total, "offer created");
        Ok(offer)
    }

    /// The merchant's offers, newest first.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials.
    pub async fn merchant_offers(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
        filter: OfferStatusFilter,
    ) -> Result<Vec<Offer>> {
        let restaurant = self.authorize(restaurant_id, api_key).await?;
        self.store.restaurant_offers(&restaurant.id, filter).await
    }

    /// Archive one of the merchant's offers.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials; `NotFound` when the offer does not
    /// belong to the merchant.
    #[tracing::instrument(skip(self, api_key))]
    pub async fn archive_offer(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
        offer_id: &OfferId,
    ) -> Result<Offer> {
        let restaurant = self.authorize(restaurant_id, api_key).await?;
        let offer = self
            .store
            .archive_offer(&restaurant.id, offer_id, self.clock.now())
            .await?;
        tracing::info!(%offer_id, "offer archived");
        Ok(offer)
    }

    /// Every offer of the merchant (archived included) for export.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials.
    pub async fn export_offers(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
    ) -> Result<Vec<Offer>> {
        self.merchant_offers(restaurant_id, api_key, OfferStatusFilter::All)
            .await
    }

    /// Public catalog of redeemable offers priced at the current time.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    #[tracing::instrument(skip(self))]
    pub async fn list_offers(&self, query: &CatalogQuery) -> Result<Vec<ListedOffer>> {
        let now = self.clock.now();
        let entries = self.store.catalog_entries(now, query.scan_limit()).await?;
        let items = catalog::list(entries, query, now);
        #[allow(clippy::cast_precision_loss)]
        histogram!("foody_catalog_items").record(items.len() as f64);
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------

    /// Reserve `qty` units of an offer for a buyer.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank offer id or zero quantity; `NotFound` when
    /// the offer is missing or not redeemable; `InsufficientQuantity` when
    /// not enough is left.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, offer_id: &str, qty: u32) -> Result<Reservation> {
        let offer_id = offer_id.trim();
        if offer_id.is_empty() {
            return Err(MarketError::invalid_input("offer_id required"));
        }
        if qty == 0 {
            return Err(MarketError::invalid_input("qty must be at least 1"));
        }
        let reservation = self
            .store
            .open_reservation(
                &OfferId::new(offer_id),
                qty,
                ReservationId::new(self.issuer.issue(TokenKind::Reservation)),
                RedemptionCode::new(self.issuer.issue(TokenKind::RedemptionCode)),
                self.clock.now(),
            )
            .await?;

        counter!("foody_reservations_total", "status" => "reserved").increment(1);
        tracing::info!(
            reservation_id = %reservation.id,
            offer_id = %reservation.offer_id,
            qty,
            "reservation created"
        );
        Ok(reservation)
    }

    /// Cancel a reservation as the code holder.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank code; `NotFound` for an unknown code;
    /// `InvalidState` unless the reservation is `reserved`.
    pub async fn cancel_reservation(&self, code: &str) -> Result<Reservation> {
        self.cancel_in_scope(code, CancelScope::Holder).await
    }

    /// Cancel a reservation against one of the merchant's offers.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials; otherwise as
    /// [`Marketplace::cancel_reservation`], with foreign codes `NotFound`.
    pub async fn merchant_cancel_reservation(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
        code: &str,
    ) -> Result<Reservation> {
        let restaurant = self.authorize(restaurant_id, api_key).await?;
        self.cancel_in_scope(code, CancelScope::Merchant(restaurant.id))
            .await
    }

    #[tracing::instrument(skip(self, code), fields(scope = scope.label()))]
    async fn cancel_in_scope(&self, code: &str, scope: CancelScope) -> Result<Reservation> {
        let code = parse_code(code)?;
        let reservation = self
            .store
            .cancel_reservation(&code, &scope, self.clock.now())
            .await?;

        counter!("foody_reservations_total", "status" => "canceled").increment(1);
        tracing::info!(
            reservation_id = %reservation.id,
            offer_id = %reservation.offer_id,
            qty = reservation.qty,
            "reservation canceled"
        );
        Ok(reservation)
    }

    /// Redeem a reservation at the merchant's counter.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on bad credentials; `InvalidInput` for a blank code;
    /// `NotFound` when the code is unknown to this merchant; `InvalidState`
    /// unless the reservation is `reserved`.
    #[tracing::instrument(skip(self, api_key, code))]
    pub async fn redeem(
        &self,
        restaurant_id: &RestaurantId,
        api_key: &str,
        code: &str,
    ) -> Result<Reservation> {
        let restaurant = self.authorize(restaurant_id, api_key).await?;
        let code = parse_code(code)?;
        let reservation = self
            .store
            .redeem_reservation(&code, &restaurant.id, self.clock.now())
            .await?;

        counter!("foody_reservations_total", "status" => "redeemed").increment(1);
        tracing::info!(reservation_id = %reservation.id, "reservation redeemed");
        Ok(reservation)
    }

    /// Storage readiness.
    ///
    /// # Errors
    ///
    /// `Internal` when the store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}
