//! Business metrics for the marketplace.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `foody_reservations_total{status}` - Reservations by transition (reserved, canceled, redeemed)
//! - `foody_offers_created_total` - Offers created by merchants
//! - `foody_merchants_registered_total` - Merchant registrations
//!
//! ## Histograms
//! - `foody_catalog_items` - Items returned per catalog query

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Register all business metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "foody_reservations_total",
        "Total number of reservation transitions by status (reserved, canceled, redeemed)"
    );
    describe_counter!(
        "foody_offers_created_total",
        "Total number of offers created by merchants"
    );
    describe_counter!(
        "foody_merchants_registered_total",
        "Total number of merchant registrations"
    );
    describe_histogram!(
        "foody_catalog_items",
        "Number of offers returned per catalog query"
    );

    tracing::info!("Business metrics registered");
}

/// Install the Prometheus recorder and serve it over HTTP on `addr`.
///
/// # Errors
///
/// Returns [`BuildError`] when the recorder is already installed or the
/// listener cannot be set up.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_business_metrics();
    Ok(())
}
