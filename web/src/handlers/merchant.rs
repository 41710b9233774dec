//! Merchant account endpoints.

use axum::{Json, extract::State};
use foody_core::{Credentials, RestaurantProfile};

use crate::dto::{
    MerchantCancelRequest, OkResponse, ProfileUpdateRequest, RecoverRequest, RecoverResponse,
    RedeemRequest, RegisterRequest, RestaurantQuery,
};
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiQuery, MerchantKey};
use crate::state::AppState;

/// `POST /api/v1/merchant/register_public`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<Credentials>, AppError> {
    let credentials = state.market().register(req.into()).await?;
    Ok(Json(credentials))
}

/// `GET /api/v1/merchant/profile?restaurant_id=`
pub async fn get_profile(
    State(state): State<AppState>,
    key: MerchantKey,
    ApiQuery(query): ApiQuery<RestaurantQuery>,
) -> Result<Json<RestaurantProfile>, AppError> {
    let profile = state
        .market()
        .profile(&query.restaurant_id, key.as_str())
        .await?;
    Ok(Json(profile))
}

/// `POST /api/v1/merchant/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    key: MerchantKey,
    ApiJson(req): ApiJson<ProfileUpdateRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let (restaurant_id, update) = req.into_parts();
    state
        .market()
        .update_profile(&restaurant_id, key.as_str(), update)
        .await?;
    Ok(Json(OkResponse::OK))
}

/// `POST /api/v1/merchant/redeem`
pub async fn redeem(
    State(state): State<AppState>,
    key: MerchantKey,
    ApiJson(req): ApiJson<RedeemRequest>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .market()
        .redeem(&req.restaurant_id, key.as_str(), &req.code)
        .await?;
    Ok(Json(OkResponse::OK))
}

/// `POST /api/v1/merchant/reservations/cancel`
pub async fn cancel_reservation(
    State(state): State<AppState>,
    key: MerchantKey,
    ApiJson(req): ApiJson<MerchantCancelRequest>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .market()
        .merchant_cancel_reservation(&req.restaurant_id, key.as_str(), &req.code)
        .await?;
    Ok(Json(OkResponse::OK))
}

/// `POST /api/v1/merchant/recover`
///
/// Disabled (503) unless a recovery secret is configured; a wrong secret
/// is 403.
pub async fn recover(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RecoverRequest>,
) -> Result<Json<RecoverResponse>, AppError> {
    let Some(secret) = state.recovery_secret() else {
        return Err(AppError::unavailable("key recovery is disabled"));
    };
    if !constant_time_eq::constant_time_eq(secret.as_bytes(), req.secret.trim().as_bytes()) {
        tracing::warn!("key recovery attempted with a wrong secret");
        return Err(AppError::forbidden("invalid recovery secret"));
    }

    let restaurant = state.market().recover_by_phone(&req.phone).await?;
    Ok(Json(RecoverResponse {
        restaurant_id: restaurant.id,
        api_key: restaurant.api_key.expose().to_string(),
        title: restaurant.title,
    }))
}
