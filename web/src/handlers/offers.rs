//! Offer endpoints: the merchant's own listings and the public catalog.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use foody_core::{CatalogQuery, ListedOffer, Offer, OfferId};

use crate::csv::offers_csv;
use crate::dto::{
    CatalogParams, CreateOfferRequest, CreatedOffer, MerchantOffersQuery, OkResponse,
    RestaurantQuery,
};
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiQuery, MerchantKey};
use crate::state::AppState;

/// `GET /api/v1/merchant/offers?restaurant_id=&status=`
pub async fn merchant_offers(
    State(state): State<AppState>,
    key: MerchantKey,
    ApiQuery(query): ApiQuery<MerchantOffersQuery>,
) -> Result<Json<Vec<Offer>>, AppError> {
    let offers = state
        .market()
        .merchant_offers(&query.restaurant_id, key.as_str(), query.filter())
        .await?;
    Ok(Json(offers))
}

/// `POST /api/v1/merchant/offers`
pub async fn create_offer(
    State(state): State<AppState>,
    key: MerchantKey,
    ApiJson(req): ApiJson<CreateOfferRequest>,
) -> Result<Json<CreatedOffer>, AppError> {
    let (restaurant_id, draft) = req.into_parts()?;
    let offer = state
        .market()
        .create_offer(&restaurant_id, key.as_str(), draft)
        .await?;
    Ok(Json(CreatedOffer { id: offer.id }))
}

/// `DELETE /api/v1/merchant/offers/{offer_id}?restaurant_id=`
pub async fn archive_offer(
    State(state): State<AppState>,
    key: MerchantKey,
    Path(offer_id): Path<String>,
    ApiQuery(query): ApiQuery<RestaurantQuery>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .market()
        .archive_offer(&query.restaurant_id, key.as_str(), &OfferId::new(offer_id))
        .await?;
    Ok(Json(OkResponse::OK))
}

/// `GET /api/v1/merchant/offers/csv?restaurant_id=`
pub async fn export_csv(
    State(state): State<AppState>,
    key: MerchantKey,
    ApiQuery(query): ApiQuery<RestaurantQuery>,
) -> Result<impl IntoResponse, AppError> {
    let offers = state
        .market()
        .export_offers(&query.restaurant_id, key.as_str())
        .await?;
    let disposition = format!("attachment; filename=\"offers_{}.csv\"", query.restaurant_id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        offers_csv(&offers),
    ))
}

/// `GET /api/v1/offers?lat=&lon=&sort=&radius_km=&limit=&offset=`
pub async fn catalog(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CatalogParams>,
) -> Result<Json<Vec<ListedOffer>>, AppError> {
    let offers = state.market().list_offers(&CatalogQuery::from(params)).await?;
    Ok(Json(offers))
}
