//! HTTP surface of the Foody marketplace.
//!
//! Handlers are thin: they extract typed requests, call
//! [`foody_core::Marketplace`] and map [`foody_core::MarketError`] kinds to
//! status codes through [`AppError`].
//!
//! # Example
//!
//! ```ignore
//! use foody_web::{AppState, RouterConfig, router};
//!
//! let app = router(AppState::new(market), &RouterConfig::default());
//! axum::serve(listener, app).await?;
//! ```

pub mod csv;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod qr;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{ApiJson, ApiQuery, MERCHANT_KEY_HEADER, MerchantKey};
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use qr::{PlaceholderQr, PngQr, QrRenderer};
pub use router::{RouterConfig, router};
pub use state::AppState;
