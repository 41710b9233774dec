//! Public offer catalog: filtering, distance, sorting and pagination.
//!
//! The storage backend supplies candidate offers joined with their
//! restaurant; everything else happens here against the caller's clock, so
//! every backend lists offers identically.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{GeoPoint, Offer, RestaurantProfile};

/// Mean Earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Upper bound on `limit`.
pub const MAX_PAGE_SIZE: usize = 500;

/// Catalog ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Newest first.
    #[default]
    New,
    /// Cheapest effective price first.
    Price,
    /// Closest first; offers without a distance go last.
    Distance,
}

impl SortMode {
    /// Parse a sort name; unknown names fall back to [`SortMode::New`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "price" => Self::Price,
            "distance" => Self::Distance,
            _ => Self::New,
        }
    }
}

/// Catalog filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogQuery {
    /// Buyer location, enabling distances.
    pub location: Option<GeoPoint>,
    /// Maximum distance; only applied together with `location`.
    pub radius_km: Option<f64>,
    /// Ordering.
    pub sort: SortMode,
    /// Page size, capped at [`MAX_PAGE_SIZE`].
    pub limit: Option<usize>,
    /// Items to skip.
    pub offset: usize,
}

impl CatalogQuery {
    /// Effective page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    /// How many newest candidates storage needs to read to fill the page.
    ///
    /// `None` when the page depends on every candidate: a price or distance
    /// ordering, or a radius filter.
    #[must_use]
    pub fn scan_limit(&self) -> Option<usize> {
        let newest_first = match self.sort {
            SortMode::New => true,
            SortMode::Price => false,
            SortMode::Distance => self.location.is_none(),
        };
        let radius_filtered = self.location.is_some() && self.radius_km.is_some();
        (newest_first && !radius_filtered).then(|| self.offset.saturating_add(self.page_size()))
    }
}

/// Candidate row handed over by storage.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    /// The offer.
    pub offer: Offer,
    /// Its restaurant.
    pub restaurant: RestaurantProfile,
}

/// An offer as shown to buyers, priced at query time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListedOffer {
    /// Offer fields.
    #[serde(flatten)]
    pub offer: Offer,
    /// Price after the current discount tier.
    pub effective_price_cents: i64,
    /// Current discount tier in percent.
    pub discount_percent: u8,
    /// Distance to the buyer, when both ends have coordinates.
    pub distance_km: Option<f64>,
    /// Restaurant summary.
    pub restaurant: RestaurantProfile,
}

/// Great-circle distance between two points in kilometres.
#[must_use]
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Build the catalog page for `query` at `now`.
#[must_use]
pub fn list(
    entries: Vec<CatalogEntry>,
    query: &CatalogQuery,
    now: DateTime<Utc>,
) -> Vec<ListedOffer> {
    let mut items: Vec<ListedOffer> = entries
        .into_iter()
        .filter(|entry| entry.offer.is_redeemable(now))
        .map(|entry| {
            let distance_km = query
                .location
                .zip(entry.restaurant.location())
                .map(|(buyer, restaurant)| haversine_km(buyer, restaurant));
            ListedOffer {
                effective_price_cents: entry.offer.effective_price(now),
                discount_percent: entry.offer.discount_percent(now),
                distance_km,
                offer: entry.offer,
                restaurant: entry.restaurant,
            }
        })
        .collect();

    if let (Some(_), Some(radius_km)) = (query.location, query.radius_km) {
        items.retain(|item| item.distance_km.is_some_and(|d| d <= radius_km));
    }

    // Newest first is the base order; the other modes sort stably on top.
    items.sort_by(|a, b| b.offer.created_at.cmp(&a.offer.created_at));
    match query.sort {
        SortMode::New => {}
        SortMode::Price => items.sort_by_key(|item| item.effective_price_cents),
        SortMode::Distance if query.location.is_some() => {
            items.sort_by(|a, b| match (a.distance_km, b.distance_km) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }
        SortMode::Distance => {}
    }

    items
        .into_iter()
        .skip(query.offset)
        .take(query.page_size())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{OfferId, RestaurantId};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 5, 20, 0, 0).unwrap()
    }

    fn entry(id: &str, age_min: i64, price: i64, at: Option<GeoPoint>) -> CatalogEntry {
        CatalogEntry {
            offer: Offer {
                id: OfferId::new(id),
                restaurant_id: RestaurantId::new("RID_1"),
                title: id.to_string(),
                description: None,
                price_cents: price,
                original_price_cents: None,
                qty_left: 1,
                qty_total: 1,
                expires_at: Some(now() + Duration::hours(5)),
                archived_at: None,
                photo_url: None,
                created_at: now() - Duration::minutes(age_min),
            },
            restaurant: RestaurantProfile {
                id: RestaurantId::new("RID_1"),
                title: "Cafe".to_string(),
                phone: None,
                city: None,
                address: None,
                lat: at.map(|p| p.lat),
                lon: at.map(|p| p.lon),
            },
        }
    }

    fn ids(items: &[ListedOffer]) -> Vec<&str> {
        items.iter().map(|i| i.offer.id.as_str()).collect()
    }

    const MOSCOW: GeoPoint = GeoPoint::new(55.7558, 37.6173);
    const KAZAN: GeoPoint = GeoPoint::new(55.7963, 49.1088);
    const NEARBY: GeoPoint = GeoPoint::new(55.7600, 37.6200);

    #[test]
    fn haversine_matches_known_distance() {
        let d = haversine_km(MOSCOW, KAZAN);
        assert!((d - 719.0).abs() < 5.0, "got {d}");
        assert!(haversine_km(MOSCOW, MOSCOW).abs() < f64::EPSILON);
    }

    #[test]
    fn excludes_unredeemable_offers() {
        let mut archived = entry("archived", 1, 100, None);
        archived.offer.archived_at = Some(now());
        let mut expired = entry("expired", 2, 100, None);
        expired.offer.expires_at = Some(now());
        let mut sold_out = entry("sold_out", 3, 100, None);
        sold_out.offer.qty_left = 0;
        let live = entry("live", 4, 100, None);

        let items = list(vec![archived, expired, sold_out, live], &CatalogQuery::default(), now());
        assert_eq!(ids(&items), vec!["live"]);
    }

    #[test]
    fn new_sort_is_newest_first() {
        let items = list(
            vec![entry("old", 30, 1, None), entry("new", 1, 1, None), entry("mid", 10, 1, None)],
            &CatalogQuery::default(),
            now(),
        );
        assert_eq!(ids(&items), vec!["new", "mid", "old"]);
    }

    #[test]
    fn price_sort_uses_effective_price_and_keeps_new_order_on_ties() {
        let mut discounted = entry("discounted", 50, 900, None);
        discounted.offer.original_price_cents = Some(1_000);
        discounted.offer.expires_at = Some(now() + Duration::minutes(20));
        let query = CatalogQuery {
            sort: SortMode::Price,
            ..CatalogQuery::default()
        };
        let items = list(
            vec![
                entry("tie_old", 40, 500, None),
                entry("tie_new", 5, 500, None),
                discounted,
            ],
            &query,
            now(),
        );
        assert_eq!(ids(&items), vec!["discounted", "tie_new", "tie_old"]);
        assert_eq!(items[0].effective_price_cents, 300);
        assert_eq!(items[0].discount_percent, 70);
    }

    #[test]
    fn distance_sort_puts_unknown_last() {
        let query = CatalogQuery {
            location: Some(MOSCOW),
            sort: SortMode::Distance,
            ..CatalogQuery::default()
        };
        let items = list(
            vec![
                entry("nowhere", 1, 1, None),
                entry("kazan", 2, 1, Some(KAZAN)),
                entry("nearby", 3, 1, Some(NEARBY)),
            ],
            &query,
            now(),
        );
        assert_eq!(ids(&items), vec!["nearby", "kazan", "nowhere"]);
        assert!(items[2].distance_km.is_none());
    }

    #[test]
    fn distance_sort_without_location_falls_back_to_new() {
        let query = CatalogQuery {
            sort: SortMode::Distance,
            ..CatalogQuery::default()
        };
        let items = list(
            vec![entry("b", 5, 1, Some(KAZAN)), entry("a", 1, 1, Some(NEARBY))],
            &query,
            now(),
        );
        assert_eq!(ids(&items), vec!["a", "b"]);
        assert!(items.iter().all(|i| i.distance_km.is_none()));
    }

    #[test]
    fn radius_filter_drops_far_and_unknown() {
        let query = CatalogQuery {
            location: Some(MOSCOW),
            radius_km: Some(10.0),
            ..CatalogQuery::default()
        };
        let items = list(
            vec![
                entry("nowhere", 1, 1, None),
                entry("kazan", 2, 1, Some(KAZAN)),
                entry("nearby", 3, 1, Some(NEARBY)),
            ],
            &query,
            now(),
        );
        assert_eq!(ids(&items), vec!["nearby"]);
    }

    #[test]
    fn radius_without_location_is_ignored() {
        let query = CatalogQuery {
            radius_km: Some(1.0),
            ..CatalogQuery::default()
        };
        let items = list(vec![entry("nowhere", 1, 1, None)], &query, now());
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn unknown_sort_parses_as_new() {
        assert_eq!(SortMode::parse("price"), SortMode::Price);
        assert_eq!(SortMode::parse("Distance"), SortMode::Distance);
        assert_eq!(SortMode::parse("rating"), SortMode::New);
        assert_eq!(SortMode::parse(""), SortMode::New);
    }

    #[test]
    fn pagination_applies_after_sorting() {
        let entries = (0..10).map(|i| entry(&format!("o{i}"), i, 1, None)).collect();
        let query = CatalogQuery {
            limit: Some(3),
            offset: 2,
            ..CatalogQuery::default()
        };
        let items = list(entries, &query, now());
        assert_eq!(ids(&items), vec!["o2", "o3", "o4"]);
    }

    #[test]
    fn scan_limit_covers_newest_pages_only() {
        let page = CatalogQuery {
            limit: Some(20),
            offset: 40,
            ..CatalogQuery::default()
        };
        assert_eq!(page.scan_limit(), Some(60));
        assert_eq!(CatalogQuery::default().scan_limit(), Some(MAX_PAGE_SIZE));

        let huge = CatalogQuery {
            limit: Some(10_000),
            ..CatalogQuery::default()
        };
        assert_eq!(huge.scan_limit(), Some(MAX_PAGE_SIZE));

        let by_price = CatalogQuery {
            sort: SortMode::Price,
            ..CatalogQuery::default()
        };
        assert_eq!(by_price.scan_limit(), None);

        let distance_without_location = CatalogQuery {
            sort: SortMode::Distance,
            ..CatalogQuery::default()
        };
        assert_eq!(distance_without_location.scan_limit(), Some(MAX_PAGE_SIZE));

        let within_radius = CatalogQuery {
            location: Some(MOSCOW),
            radius_km: Some(3.0),
            ..CatalogQuery::default()
        };
        assert_eq!(within_radius.scan_limit(), None);
    }

    #[test]
    fn newest_page_from_truncated_candidates_matches_full_scan() {
        let entries: Vec<CatalogEntry> = (0..8)
            .map(|n| entry(&format!("o{n}"), n * 10, 100, None))
            .collect();
        let query = CatalogQuery {
            limit: Some(3),
            offset: 2,
            ..CatalogQuery::default()
        };
        let bound = query.scan_limit().unwrap();

        let full = list(entries.clone(), &query, now());
        let truncated = list(entries.into_iter().take(bound).collect(), &query, now());
        assert_eq!(full, truncated);
        assert_eq!(ids(&truncated), vec!["o2", "o3", "o4"]);
    }

    #[test]
    fn listed_offer_serializes_flat() {
        let query = CatalogQuery {
            location: Some(MOSCOW),
            ..CatalogQuery::default()
        };
        let items = list(vec![entry("o1", 0, 500, Some(NEARBY))], &query, now());
        let json = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(json["id"], "o1");
        assert_eq!(json["effective_price_cents"], 500);
        assert_eq!(json["discount_percent"], 0);
        assert!(json["distance_km"].as_f64().unwrap() < 1.0);
        assert_eq!(json["restaurant"]["title"], "Cafe");
        assert!(json.get("offer").is_none());
    }
}
