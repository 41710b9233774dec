//! Ready-wired marketplace and sample inputs.

use std::sync::Arc;

use chrono::TimeDelta;
use foody_core::environment::Clock;
use foody_core::service::Marketplace;
use foody_core::types::{NewRestaurant, OfferDraft};

use crate::memory::InMemoryMarketStore;
use crate::mocks::{FixedClock, SequentialIssuer, test_clock};

/// A [`Marketplace`] over an in-memory store with a controllable clock.
#[derive(Debug, Clone)]
pub struct TestMarket {
    /// The service under test.
    pub market: Marketplace,
    /// Direct handle on its store.
    pub store: Arc<InMemoryMarketStore>,
    /// Shared clock; advancing it moves the service's time.
    pub clock: FixedClock,
}

/// Build a [`TestMarket`] at [`test_clock`] time with sequential ids.
#[must_use]
pub fn test_market() -> TestMarket {
    let store = Arc::new(InMemoryMarketStore::new());
    let clock = test_clock();
    let market = Marketplace::new(store.clone())
        .with_clock(Arc::new(clock.clone()))
        .with_issuer(Arc::new(SequentialIssuer::new()));
    TestMarket {
        market,
        store,
        clock,
    }
}

/// Registration details for a bakery with a phone and coordinates.
#[must_use]
pub fn bakery() -> NewRestaurant {
    NewRestaurant {
        title: "Corner Bakery".to_string(),
        phone: Some("+7 700 000 0001".to_string()),
        city: Some("Almaty".to_string()),
        address: Some("Abay Ave 10".to_string()),
        lat: Some(43.2380),
        lon: Some(76.9450),
    }
}

/// Registration details for a second, unrelated merchant.
#[must_use]
pub fn noodle_bar() -> NewRestaurant {
    NewRestaurant {
        title: "Noodle Bar".to_string(),
        phone: Some("+7 700 000 0002".to_string()),
        city: Some("Astana".to_string()),
        address: None,
        lat: Some(51.1694),
        lon: Some(71.4491),
    }
}

/// Draft matching the canonical pricing example: base 29 900, original
/// 34 900, expiring 110 minutes after the clock's current time.
#[must_use]
pub fn pastry_draft(clock: &FixedClock, qty: i64) -> OfferDraft {
    OfferDraft {
        title: "Pastry box".to_string(),
        description: Some("Croissants and buns".to_string()),
        price_cents: 29_900,
        original_price_cents: Some(34_900),
        qty_total: qty,
        qty_left: None,
        expires_at: Some(clock.now() + TimeDelta::minutes(110)),
        photo_url: None,
    }
}

/// Plain draft without an original price or expiry.
#[must_use]
pub fn plain_draft(title: &str, price_cents: i64, qty: i64) -> OfferDraft {
    OfferDraft {
        title: title.to_string(),
        price_cents,
        qty_total: qty,
        ..OfferDraft::default()
    }
}
