//! Route table and middleware stack.

use std::time::Duration;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, merchant, offers, reservations};
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// HTTP-level settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins; empty disables CORS, `*` allows any.
    pub cors_origins: Vec<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState, config: &RouterConfig) -> Router {
    let merchant_routes = Router::new()
        .route("/register_public", post(merchant::register))
        .route(
            "/profile",
            get(merchant::get_profile).post(merchant::update_profile),
        )
        .route(
            "/offers",
            get(offers::merchant_offers).post(offers::create_offer),
        )
        .route("/offers/csv", get(offers::export_csv))
        .route("/offers/:offer_id", delete(offers::archive_offer))
        .route("/redeem", post(merchant::redeem))
        .route("/reservations/cancel", post(merchant::cancel_reservation))
        .route("/recover", post(merchant::recover));

    let api = Router::new()
        .nest("/merchant", merchant_routes)
        .route("/offers", get(offers::catalog))
        .route("/reservations", post(reservations::reserve))
        .route("/reservations/cancel", post(reservations::cancel))
        .route("/reservations/qr", get(reservations::qr));

    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer());

    if let Some(cors) = cors_layer(&config.cors_origins) {
        app = app.layer(cors);
    }
    app
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(layer.allow_origin(AllowOrigin::list(allowed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_is_disabled_without_origins() {
        assert!(cors_layer(&[]).is_none());
    }

    #[test]
    fn cors_accepts_wildcard_and_lists() {
        assert!(cors_layer(&["*".to_string()]).is_some());
        assert!(cors_layer(&["https://foody.example".to_string()]).is_some());
    }
}
