//! # Foody Core
//!
//! Domain model and rules for a surplus-food marketplace: merchants list
//! offers that get cheaper as they approach expiry, buyers reserve units and
//! receive a redemption code, merchants redeem the code at the counter.
//!
//! ## Modules
//!
//! - [`types`]: identifiers, offers, reservations, merchant accounts
//! - [`pricing`]: time-based discount tiers
//! - [`ledger`]: reserve/release rules for offer stock
//! - [`reservation`]: reservation transitions and cancel scopes
//! - [`issuer`]: random identifiers and secrets
//! - [`catalog`]: public listing with distance, sorting and pagination
//! - [`store`]: storage ports implemented by backends
//! - [`service`]: the [`Marketplace`] entry point
//!
//! ## Example
//!
//! ```ignore
//! use foody_core::{Marketplace, NewRestaurant};
//!
//! let market = Marketplace::new(store);
//! let creds = market
//!     .register(NewRestaurant { title: "Bakery".into(), ..Default::default() })
//!     .await?;
//! let reservation = market.reserve("OFF_4f1c2a9b0d3e", 2).await?;
//! market
//!     .redeem(&creds.restaurant_id, creds.api_key.expose(), reservation.code.as_str())
//!     .await?;
//! ```

pub mod catalog;
pub mod environment;
pub mod error;
pub mod issuer;
pub mod ledger;
pub mod pricing;
pub mod reservation;
pub mod service;
pub mod store;
pub mod types;

pub use catalog::{CatalogEntry, CatalogQuery, ListedOffer, SortMode};
pub use environment::{Clock, SystemClock};
pub use error::{MarketError, Result};
pub use issuer::{RandomIssuer, TokenIssuer, TokenKind};
pub use reservation::CancelScope;
pub use service::{Credentials, Marketplace};
pub use store::{
    InventoryLedger, MarketStore, MerchantDirectory, OfferRepository, ReservationRepository,
    StoreFuture,
};
pub use types::{
    ApiKey, GeoPoint, NewRestaurant, Offer, OfferDraft, OfferId, OfferStatusFilter,
    ProfileUpdate, RedemptionCode, Reservation, ReservationId, ReservationStatus, Restaurant,
    RestaurantId, RestaurantProfile,
};
