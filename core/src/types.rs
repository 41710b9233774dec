//! Domain types for the marketplace.
//!
//! Identifiers are opaque strings produced by the [`crate::issuer`]; money is
//! always held in integer minor units (cents); quantities are unsigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MarketError, Result};
use crate::pricing;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a merchant account (`RID_...`).
    RestaurantId
);

string_id!(
    /// Identifier of an offer (`OFF_...`).
    OfferId
);

string_id!(
    /// Identifier of a reservation record (`RSV_...`).
    ReservationId
);

string_id!(
    /// Redemption code handed to the buyer (`RES_...`).
    ///
    /// Possession of the code is what lets the holder cancel, and what
    /// merchant staff scan to redeem.
    RedemptionCode
);

/// Secret API key of a merchant account.
///
/// `Debug` output is redacted so keys never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap an existing key value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw key (for persistence and the registration response).
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compare against a presented key in constant time.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_eq::constant_time_eq(self.0.as_bytes(), presented.as_bytes())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

// ============================================================================
// Merchants
// ============================================================================

/// A point on the globe in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A merchant account.
#[derive(Clone, Debug, PartialEq)]
pub struct Restaurant {
    /// Account identifier.
    pub id: RestaurantId,
    /// Shared secret authorising mutations of this account's resources.
    pub api_key: ApiKey,
    /// Display name.
    pub title: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Latitude, if known.
    pub lat: Option<f64>,
    /// Longitude, if known.
    pub lon: Option<f64>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl Restaurant {
    /// Coordinates, when both latitude and longitude are stored.
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.lat?, self.lon?))
    }

    /// Public view of the account (everything except the key).
    #[must_use]
    pub fn profile(&self) -> RestaurantProfile {
        RestaurantProfile {
            id: self.id.clone(),
            title: self.title.clone(),
            phone: self.phone.clone(),
            city: self.city.clone(),
            address: self.address.clone(),
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Public, key-less view of a merchant account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    /// Account identifier.
    pub id: RestaurantId,
    /// Display name.
    pub title: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lon: Option<f64>,
}

impl RestaurantProfile {
    /// Coordinates, when both latitude and longitude are stored.
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.lat?, self.lon?))
    }
}

/// Registration details for a new merchant account.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewRestaurant {
    /// Display name (required).
    pub title: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lon: Option<f64>,
}

impl NewRestaurant {
    /// Trim text fields, turn blanks into `None` and require a title.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidInput`] when the title is blank.
    pub fn normalized(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(MarketError::invalid_input("title required"));
        }
        Ok(Self {
            title,
            phone: non_blank(self.phone),
            city: non_blank(self.city),
            address: non_blank(self.address),
            lat: self.lat,
            lon: self.lon,
        })
    }
}

/// Replacement values for a merchant profile.
///
/// Contact fields and coordinates are replaced wholesale; the title is only
/// replaced when a non-blank value is supplied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    /// New display name, if any.
    pub title: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lon: Option<f64>,
}

impl ProfileUpdate {
    /// Trim text fields and drop blank values.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            title: non_blank(self.title),
            phone: non_blank(self.phone),
            city: non_blank(self.city),
            address: non_blank(self.address),
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// Apply the update to a restaurant record.
    pub fn apply_to(&self, restaurant: &mut Restaurant) {
        if let Some(title) = &self.title {
            restaurant.title.clone_from(title);
        }
        restaurant.phone.clone_from(&self.phone);
        restaurant.city.clone_from(&self.city);
        restaurant.address.clone_from(&self.address);
        restaurant.lat = self.lat;
        restaurant.lon = self.lon;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Offers
// ============================================================================

/// A merchant-listed quantity of discounted inventory.
///
/// Invariant: `qty_left <= qty_total`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Offer identifier.
    pub id: OfferId,
    /// Owning merchant.
    pub restaurant_id: RestaurantId,
    /// Title shown to buyers.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Base price in minor units.
    pub price_cents: i64,
    /// Pre-discount price in minor units; drives the time-based discount.
    pub original_price_cents: Option<i64>,
    /// Quantity still available for reservation.
    pub qty_left: u32,
    /// Quantity originally listed.
    pub qty_total: u32,
    /// After this instant the offer can no longer be reserved.
    pub expires_at: Option<DateTime<Utc>>,
    /// Set once the merchant archives the offer; never cleared.
    pub archived_at: Option<DateTime<Utc>>,
    /// Opaque photo reference.
    pub photo_url: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Build a new offer from a merchant draft, enforcing the quantity
    /// and price invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidInput`] when the title is blank, a price
    /// is negative, or the quantities are out of range.
    pub fn create(
        id: OfferId,
        restaurant_id: RestaurantId,
        draft: OfferDraft,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(MarketError::invalid_input("title required"));
        }
        if draft.price_cents < 0 {
            return Err(MarketError::invalid_input("price must not be negative"));
        }
        let original_price_cents = match draft.original_price_cents {
            Some(original) if original < 0 => {
                return Err(MarketError::invalid_input(
                    "original price must not be negative",
                ));
            }
            Some(0) | None => None,
            Some(original) => Some(original),
        };

        let qty_total = u32::try_from(draft.qty_total)
            .map_err(|_| MarketError::invalid_input("qty_total must be between 0 and 2^32-1"))?;
        let qty_left = match draft.qty_left {
            Some(left) => u32::try_from(left)
                .map_err(|_| MarketError::invalid_input("qty_left must not be negative"))?,
            None => qty_total,
        };
        if qty_left > qty_total {
            return Err(MarketError::invalid_input(
                "qty_left must not exceed qty_total",
            ));
        }

        Ok(Self {
            id,
            restaurant_id,
            title,
            description: non_blank(draft.description),
            price_cents: draft.price_cents,
            original_price_cents,
            qty_left,
            qty_total,
            expires_at: draft.expires_at,
            archived_at: None,
            photo_url: non_blank(draft.photo_url),
            created_at: now,
        })
    }

    /// Whether the expiry instant has been reached.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Whether the offer has been archived by its merchant.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Not archived, not expired, and has stock left.
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_archived() && !self.is_expired(now) && self.qty_left > 0
    }

    /// Current price after the time-based discount.
    #[must_use]
    pub fn effective_price(&self, now: DateTime<Utc>) -> i64 {
        pricing::effective_price(
            self.price_cents,
            self.original_price_cents,
            self.expires_at,
            now,
        )
    }

    /// Current discount tier in percent.
    #[must_use]
    pub fn discount_percent(&self, now: DateTime<Utc>) -> u8 {
        pricing::discount_percent(self.expires_at, now)
    }
}

/// Unvalidated offer fields supplied by a merchant.
///
/// Quantities are signed so that negative input reaches validation instead
/// of failing deserialisation with an opaque error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OfferDraft {
    /// Title (required).
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Base price in minor units.
    pub price_cents: i64,
    /// Original price in minor units; `0` is treated as absent.
    pub original_price_cents: Option<i64>,
    /// Total quantity.
    pub qty_total: i64,
    /// Remaining quantity; defaults to `qty_total`.
    pub qty_left: Option<i64>,
    /// Expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Photo reference.
    pub photo_url: Option<String>,
}

/// Filter for a merchant's own offer list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatusFilter {
    /// Not archived.
    #[default]
    Active,
    /// Archived only.
    Archived,
    /// Everything.
    All,
}

impl OfferStatusFilter {
    /// Parse a filter name; anything unrecognised lists everything.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "archived" => Self::Archived,
            _ => Self::All,
        }
    }

    /// Whether an offer passes this filter.
    #[must_use]
    pub const fn admits(self, offer: &Offer) -> bool {
        match self {
            Self::Active => !offer.is_archived(),
            Self::Archived => offer.is_archived(),
            Self::All => true,
        }
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// Lifecycle status of a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Stock is held for the holder of the code.
    Reserved,
    /// Canceled; stock was returned to the offer.
    Canceled,
    /// Fulfilled by the merchant; stock is consumed.
    Redeemed,
}

impl ReservationStatus {
    /// Storage/wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Canceled => "canceled",
            Self::Redeemed => "redeemed",
        }
    }

    /// Parse a storage/wire name.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Internal`] for unknown names, which can only
    /// come from corrupt rows.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "reserved" => Ok(Self::Reserved),
            "canceled" => Ok(Self::Canceled),
            "redeemed" => Ok(Self::Redeemed),
            other => Err(MarketError::internal(format!(
                "unknown reservation status '{other}'"
            ))),
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Reserved)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hold on part of an offer's stock, identified by a redemption code.
///
/// Transitions are implemented in [`crate::reservation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Record identifier.
    pub id: ReservationId,
    /// Offer the stock was taken from.
    pub offer_id: OfferId,
    /// Merchant owning the offer at creation time.
    pub restaurant_id: RestaurantId,
    /// Reserved quantity (at least one).
    pub qty: u32,
    /// Unique redemption code.
    pub code: RedemptionCode,
    /// Current status.
    pub status: ReservationStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Set only when status is `canceled`.
    pub canceled_at: Option<DateTime<Utc>>,
    /// Set only when status is `redeemed`.
    pub redeemed_at: Option<DateTime<Utc>>,
}
