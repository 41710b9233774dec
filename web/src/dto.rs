//! Request and response bodies.
//!
//! Requests are deserialized leniently and converted into core types at the
//! boundary, where malformed values become [`MarketError::InvalidInput`].

use chrono::{DateTime, Utc};
use foody_core::pricing::cents_from_major;
use foody_core::{
    CatalogQuery, GeoPoint, MarketError, NewRestaurant, OfferDraft, OfferId, OfferStatusFilter,
    ProfileUpdate, RestaurantId, Result, SortMode,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Merchant
// ============================================================================

/// `POST /api/v1/merchant/register_public`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
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

impl From<RegisterRequest> for NewRestaurant {
    fn from(req: RegisterRequest) -> Self {
        Self {
            title: req.title,
            phone: req.phone,
            city: req.city,
            address: req.address,
            lat: req.lat,
            lon: req.lon,
        }
    }
}

/// Query selecting a merchant account.
#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantQuery {
    /// Account id.
    pub restaurant_id: RestaurantId,
}

/// `POST /api/v1/merchant/profile`
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdateRequest {
    /// Account id.
    pub restaurant_id: RestaurantId,
    /// New display name; blank keeps the current one.
    #[serde(default)]
    pub title: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Latitude.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude.
    #[serde(default)]
    pub lon: Option<f64>,
}

impl ProfileUpdateRequest {
    /// Split into the account id and the update.
    #[must_use]
    pub fn into_parts(self) -> (RestaurantId, ProfileUpdate) {
        (
            self.restaurant_id,
            ProfileUpdate {
                title: self.title,
                phone: self.phone,
                city: self.city,
                address: self.address,
                lat: self.lat,
                lon: self.lon,
            },
        )
    }
}

/// `GET /api/v1/merchant/offers`
#[derive(Debug, Clone, Deserialize)]
pub struct MerchantOffersQuery {
    /// Account id.
    pub restaurant_id: RestaurantId,
    /// `active` (default), `archived` or `all`.
    #[serde(default)]
    pub status: Option<String>,
}

impl MerchantOffersQuery {
    /// Status filter; unknown values list everything.
    #[must_use]
    pub fn filter(&self) -> OfferStatusFilter {
        self.status
            .as_deref()
            .map_or_else(OfferStatusFilter::default, OfferStatusFilter::parse)
    }
}

/// `POST /api/v1/merchant/offers`
///
/// Prices may be given in major units (`*_rub`) or minor units (`*_cents`);
/// major units win when both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOfferRequest {
    /// Owning account.
    pub restaurant_id: RestaurantId,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Base price in major units.
    #[serde(default)]
    pub price_rub: Option<f64>,
    /// Base price in minor units.
    #[serde(default)]
    pub price_cents: Option<i64>,
    /// Original price in major units.
    #[serde(default)]
    pub original_price_rub: Option<f64>,
    /// Original price in minor units.
    #[serde(default)]
    pub original_price_cents: Option<i64>,
    /// Listed quantity.
    #[serde(default)]
    pub qty_total: i64,
    /// Remaining quantity; defaults to `qty_total`.
    #[serde(default)]
    pub qty_left: Option<i64>,
    /// RFC 3339 expiry.
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Photo reference.
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl CreateOfferRequest {
    /// Split into the account id and a draft, converting prices and
    /// parsing the expiry.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for non-finite prices or a malformed expiry.
    pub fn into_parts(self) -> Result<(RestaurantId, OfferDraft)> {
        let price_cents = price(self.price_rub, self.price_cents, "price_rub")?.unwrap_or(0);
        let original_price_cents = price(
            self.original_price_rub,
            self.original_price_cents,
            "original_price_rub",
        )?;
        let expires_at = self
            .expires_at
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_timestamp)
            .transpose()?;

        Ok((
            self.restaurant_id,
            OfferDraft {
                title: self.title,
                description: self.description,
                price_cents,
                original_price_cents,
                qty_total: self.qty_total,
                qty_left: self.qty_left,
                expires_at,
                photo_url: self.photo_url,
            },
        ))
    }
}

fn price(major: Option<f64>, minor: Option<i64>, field: &str) -> Result<Option<i64>> {
    match major {
        Some(amount) => cents_from_major(amount)
            .map(Some)
            .ok_or_else(|| MarketError::invalid_input(format!("{field} is not a valid amount"))),
        None => Ok(minor),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| MarketError::invalid_input("expires_at must be an RFC 3339 timestamp"))
}

/// `POST /api/v1/merchant/redeem`
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemRequest {
    /// Redeeming account.
    pub restaurant_id: RestaurantId,
    /// Redemption code.
    pub code: String,
}

/// `POST /api/v1/merchant/reservations/cancel`
#[derive(Debug, Clone, Deserialize)]
pub struct MerchantCancelRequest {
    /// Cancelling account.
    pub restaurant_id: RestaurantId,
    /// Redemption code.
    pub code: String,
}

/// `POST /api/v1/merchant/recover`
#[derive(Debug, Clone, Deserialize)]
pub struct RecoverRequest {
    /// Recovery secret configured on the server.
    #[serde(default)]
    pub secret: String,
    /// Phone registered with the account.
    #[serde(default)]
    pub phone: String,
}

/// Account credentials with the display name.
#[derive(Debug, Clone, Serialize)]
pub struct RecoverResponse {
    /// Account id.
    pub restaurant_id: RestaurantId,
    /// Account key.
    pub api_key: String,
    /// Display name.
    pub title: String,
}

/// `{"id": ...}` for a created offer.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOffer {
    /// New offer id.
    pub id: OfferId,
}

// ============================================================================
// Buyer
// ============================================================================

/// `GET /api/v1/offers`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogParams {
    /// Buyer latitude.
    pub lat: Option<f64>,
    /// Buyer longitude.
    pub lon: Option<f64>,
    /// `new`, `price` or `distance`.
    pub sort: Option<String>,
    /// Maximum distance in km.
    pub radius_km: Option<f64>,
    /// Page size.
    pub limit: Option<usize>,
    /// Items to skip.
    pub offset: Option<usize>,
}

impl From<CatalogParams> for CatalogQuery {
    fn from(params: CatalogParams) -> Self {
        let location = match (params.lat, params.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        Self {
            location,
            radius_km: params.radius_km,
            sort: params.sort.as_deref().map(SortMode::parse).unwrap_or_default(),
            limit: params.limit,
            offset: params.offset.unwrap_or(0),
        }
    }
}

const fn default_qty() -> i64 {
    1
}

/// `POST /api/v1/reservations`
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    /// Offer to reserve from.
    pub offer_id: String,
    /// Units to hold.
    #[serde(default = "default_qty")]
    pub qty: i64,
}

impl ReserveRequest {
    /// Requested quantity as an unsigned count.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when negative or too large.
    pub fn quantity(&self) -> Result<u32> {
        u32::try_from(self.qty).map_err(|_| MarketError::invalid_input("qty must be positive"))
    }
}

/// Reservation handed back to the buyer.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationCreated {
    /// Reservation id.
    pub reservation_id: String,
    /// Redemption code.
    pub code: String,
    /// Reserved offer.
    pub offer_id: String,
    /// Units held.
    pub qty: u32,
    /// Lifecycle state.
    pub status: String,
    /// QR image for the code.
    pub qrcode_png_base64: String,
}

/// `POST /api/v1/reservations/cancel`
#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequest {
    /// Redemption code.
    pub code: String,
}

/// `GET /api/v1/reservations/qr`
#[derive(Debug, Clone, Deserialize)]
pub struct QrQuery {
    /// Redemption code.
    #[serde(default)]
    pub code: String,
}

/// QR image payload.
#[derive(Debug, Clone, Serialize)]
pub struct QrResponse {
    /// Base64 PNG.
    pub qrcode_png_base64: String,
}

// ============================================================================
// Shared
// ============================================================================

/// `{"ok": true}`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OkResponse {
    /// Always `true` on success.
    pub ok: bool,
}

impl OkResponse {
    /// Successful acknowledgement.
    pub const OK: Self = Self { ok: true };
}

/// Liveness payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `true`.
    pub ok: bool,
    /// Crate version.
    pub version: &'static str,
    /// Server time.
    pub time: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offer_request(body: serde_json::Value) -> CreateOfferRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn major_units_win_over_minor() {
        let req = offer_request(json!({
            "restaurant_id": "RID_1",
            "title": "Buns",
            "price_rub": 199.5,
            "price_cents": 1,
            "original_price_cents": 34900,
            "qty_total": 4
        }));
        let (rid, draft) = req.into_parts().unwrap();
        assert_eq!(rid.as_str(), "RID_1");
        assert_eq!(draft.price_cents, 19_950);
        assert_eq!(draft.original_price_cents, Some(34_900));
        assert_eq!(draft.qty_total, 4);
        assert_eq!(draft.qty_left, None);
    }

    #[test]
    fn missing_prices_default_to_zero_and_none() {
        let (_, draft) = offer_request(json!({"restaurant_id": "RID_1", "title": "Buns"}))
            .into_parts()
            .unwrap();
        assert_eq!(draft.price_cents, 0);
        assert_eq!(draft.original_price_cents, None);
        assert_eq!(draft.expires_at, None);
    }

    #[test]
    fn expiry_accepts_zulu_and_offsets() {
        let zulu = offer_request(json!({
            "restaurant_id": "RID_1", "title": "A", "expires_at": "2025-01-01T12:00:00Z"
        }))
        .into_parts()
        .unwrap()
        .1;
        let offset = offer_request(json!({
            "restaurant_id": "RID_1", "title": "A", "expires_at": "2025-01-01T17:00:00+05:00"
        }))
        .into_parts()
        .unwrap()
        .1;
        assert!(zulu.expires_at.is_some());
        assert_eq!(zulu.expires_at, offset.expires_at);
    }

    #[test]
    fn malformed_expiry_is_invalid_input() {
        let err = offer_request(json!({
            "restaurant_id": "RID_1", "title": "A", "expires_at": "tomorrow"
        }))
        .into_parts()
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn catalog_location_needs_both_coordinates() {
        let only_lat = CatalogQuery::from(CatalogParams {
            lat: Some(43.0),
            ..CatalogParams::default()
        });
        assert_eq!(only_lat.location, None);

        let both = CatalogQuery::from(CatalogParams {
            lat: Some(43.0),
            lon: Some(76.0),
            sort: Some("bogus".into()),
            ..CatalogParams::default()
        });
        assert_eq!(both.location, Some(GeoPoint::new(43.0, 76.0)));
        assert_eq!(both.sort, SortMode::New);
        assert_eq!(both.offset, 0);
    }

    #[test]
    fn reserve_qty_defaults_to_one() {
        let req: ReserveRequest = serde_json::from_value(json!({"offer_id": "OFF_1"})).unwrap();
        assert_eq!(req.quantity().unwrap(), 1);

        let negative: ReserveRequest =
            serde_json::from_value(json!({"offer_id": "OFF_1", "qty": -2})).unwrap();
        assert!(negative.quantity().is_err());
    }

    #[test]
    fn unknown_status_lists_everything() {
        let query: MerchantOffersQuery =
            serde_json::from_value(json!({"restaurant_id": "RID_1", "status": "weird"})).unwrap();
        assert_eq!(query.filter(), OfferStatusFilter::All);

        let default: MerchantOffersQuery =
            serde_json::from_value(json!({"restaurant_id": "RID_1"})).unwrap();
        assert_eq!(default.filter(), OfferStatusFilter::Active);
    }
}
