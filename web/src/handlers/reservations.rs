//! Buyer reservation endpoints.

use axum::{Json, extract::State};

use crate::dto::{
    CancelRequest, OkResponse, QrQuery, QrResponse, ReservationCreated, ReserveRequest,
};
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiQuery};
use crate::qr::qr_base64;
use crate::state::AppState;

/// `POST /api/v1/reservations`
pub async fn reserve(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ReserveRequest>,
) -> Result<Json<ReservationCreated>, AppError> {
    let qty = req.quantity()?;
    let reservation = state.market().reserve(&req.offer_id, qty).await?;
    let qrcode_png_base64 = qr_base64(state.qr(), reservation.code.as_str());
    Ok(Json(ReservationCreated {
        reservation_id: reservation.id.into_inner(),
        code: reservation.code.into_inner(),
        offer_id: reservation.offer_id.into_inner(),
        qty: reservation.qty,
        status: reservation.status.to_string(),
        qrcode_png_base64,
    }))
}

/// `POST /api/v1/reservations/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CancelRequest>,
) -> Result<Json<OkResponse>, AppError> {
    state.market().cancel_reservation(&req.code).await?;
    Ok(Json(OkResponse::OK))
}

/// `GET /api/v1/reservations/qr?code=`
#[allow(clippy::unused_async)]
pub async fn qr(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QrQuery>,
) -> Result<Json<QrResponse>, AppError> {
    let code = query.code.trim();
    if code.is_empty() {
        return Err(AppError::validation("code required"));
    }
    Ok(Json(QrResponse {
        qrcode_png_base64: qr_base64(state.qr(), code),
    }))
}
