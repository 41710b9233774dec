//! Row types and conversions between `INT` columns and domain values.

use chrono::{DateTime, Utc};
use foody_core::catalog::CatalogEntry;
use foody_core::error::{MarketError, Result};
use foody_core::types::{
    ApiKey, Offer, OfferId, RedemptionCode, Reservation, ReservationId, ReservationStatus,
    Restaurant, RestaurantId, RestaurantProfile,
};

/// Columns selected for an offer, in [`OfferRow`] order.
macro_rules! offer_columns {
    () => {
        "id, restaurant_id, title, description, price_cents, original_price_cents, \
         qty_left, qty_total, expires_at, archived_at, photo_url, created_at"
    };
}

/// Columns selected for a reservation, in [`ReservationRow`] order.
macro_rules! reservation_columns {
    () => {
        "id, offer_id, restaurant_id, qty, code, status, created_at, canceled_at, redeemed_at"
    };
}

/// Columns selected for a restaurant, in [`RestaurantRow`] order.
macro_rules! restaurant_columns {
    () => {
        "id, api_key, title, phone, city, address, lat, lon, created_at"
    };
}

pub(crate) use {offer_columns, reservation_columns, restaurant_columns};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RestaurantRow {
    id: String,
    api_key: String,
    title: String,
    phone: Option<String>,
    city: Option<String>,
    address: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    created_at: DateTime<Utc>,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Self {
            id: RestaurantId::new(row.id),
            api_key: ApiKey::new(row.api_key),
            title: row.title,
            phone: row.phone,
            city: row.city,
            address: row.address,
            lat: row.lat,
            lon: row.lon,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OfferRow {
    id: String,
    restaurant_id: String,
    title: String,
    description: Option<String>,
    price_cents: i32,
    original_price_cents: Option<i32>,
    qty_left: i32,
    qty_total: i32,
    expires_at: Option<DateTime<Utc>>,
    archived_at: Option<DateTime<Utc>>,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = MarketError;

    fn try_from(row: OfferRow) -> Result<Self> {
        let qty_left = qty_from_db(row.qty_left, &row.id)?;
        let qty_total = qty_from_db(row.qty_total, &row.id)?;
        if qty_left > qty_total {
            return Err(MarketError::internal(format!(
                "offer {} has qty_left above qty_total",
                row.id
            )));
        }
        Ok(Self {
            id: OfferId::new(row.id),
            restaurant_id: RestaurantId::new(row.restaurant_id),
            title: row.title,
            description: row.description,
            price_cents: i64::from(row.price_cents),
            original_price_cents: row.original_price_cents.map(i64::from),
            qty_left,
            qty_total,
            expires_at: row.expires_at,
            archived_at: row.archived_at,
            photo_url: row.photo_url,
            created_at: row.created_at,
        })
    }
}

/// Offer joined with its restaurant for the catalog.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CatalogRow {
    #[sqlx(flatten)]
    offer: OfferRow,
    r_title: String,
    r_phone: Option<String>,
    r_city: Option<String>,
    r_address: Option<String>,
    r_lat: Option<f64>,
    r_lon: Option<f64>,
}

impl TryFrom<CatalogRow> for CatalogEntry {
    type Error = MarketError;

    fn try_from(row: CatalogRow) -> Result<Self> {
        let offer = Offer::try_from(row.offer)?;
        let restaurant = RestaurantProfile {
            id: offer.restaurant_id.clone(),
            title: row.r_title,
            phone: row.r_phone,
            city: row.r_city,
            address: row.r_address,
            lat: row.r_lat,
            lon: row.r_lon,
        };
        Ok(Self { offer, restaurant })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReservationRow {
    id: String,
    offer_id: String,
    restaurant_id: String,
    qty: i32,
    code: String,
    status: String,
    created_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    redeemed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = MarketError;

    fn try_from(row: ReservationRow) -> Result<Self> {
        let reservation = Self {
            qty: qty_from_db(row.qty, &row.id)?,
            status: ReservationStatus::parse(&row.status)?,
            id: ReservationId::new(row.id),
            offer_id: OfferId::new(row.offer_id),
            restaurant_id: RestaurantId::new(row.restaurant_id),
            code: RedemptionCode::new(row.code),
            created_at: row.created_at,
            canceled_at: row.canceled_at,
            redeemed_at: row.redeemed_at,
        };
        reservation.check_consistency()?;
        Ok(reservation)
    }
}

fn qty_from_db(value: i32, id: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| MarketError::internal(format!("row {id} has a negative quantity")))
}

/// Quantity as an `INT` column value.
pub(crate) fn qty_to_db(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| MarketError::invalid_input(format!("{field} exceeds the storable range")))
}

/// Money amount as an `INT` column value.
pub(crate) fn cents_to_db(value: i64, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| MarketError::invalid_input(format!("{field} exceeds the storable range")))
}
