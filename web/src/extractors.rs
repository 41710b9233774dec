//! Custom Axum extractors.
//!
//! - [`MerchantKey`]: the merchant API key from the `X-Foody-Key` header
//! - [`ApiJson`] / [`ApiQuery`]: `Json` and `Query` whose rejections render
//!   as 422 [`AppError`]s instead of axum's plain-text bodies

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

use crate::error::AppError;

/// Header carrying the merchant API key.
pub const MERCHANT_KEY_HEADER: &str = "X-Foody-Key";

/// Merchant API key presented with the request.
///
/// A missing or non-UTF-8 header yields an empty key, which the
/// marketplace rejects as unauthorized.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MerchantKey(pub String);

impl MerchantKey {
    /// The presented key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for MerchantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MerchantKey(***)")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MerchantKey
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(MERCHANT_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();

        Ok(Self(key.to_string()))
    }
}

/// JSON body extractor rejecting with [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor rejecting with [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
