//! CSV export of a merchant's offers.

use chrono::{DateTime, Utc};
use foody_core::Offer;

/// Column order of the export.
pub const OFFER_CSV_HEADER: [&str; 10] = [
    "id",
    "title",
    "description",
    "price_cents",
    "original_price_cents",
    "qty_total",
    "qty_left",
    "expires_at",
    "archived_at",
    "created_at",
];

/// Render offers as RFC 4180 CSV with a header row and CRLF line endings.
///
/// Nulls become empty cells; timestamps are RFC 3339.
#[must_use]
pub fn offers_csv(offers: &[Offer]) -> String {
    let mut out = String::new();
    push_row(&mut out, OFFER_CSV_HEADER.iter().map(|h| (*h).to_string()));
    for offer in offers {
        push_row(
            &mut out,
            [
                offer.id.to_string(),
                offer.title.clone(),
                offer.description.clone().unwrap_or_default(),
                offer.price_cents.to_string(),
                offer
                    .original_price_cents
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                offer.qty_total.to_string(),
                offer.qty_left.to_string(),
                timestamp(offer.expires_at),
                timestamp(offer.archived_at),
                offer.created_at.to_rfc3339(),
            ],
        );
    }
    out
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn push_row(out: &mut String, cells: impl IntoIterator<Item = String>) {
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_cell(out, &cell);
    }
    out.push_str("\r\n");
}

fn push_cell(out: &mut String, cell: &str) {
    if cell.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&cell.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use foody_core::{OfferId, RestaurantId};

    fn offer(title: &str, description: Option<&str>) -> Offer {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).single().unwrap_or_default();
        Offer {
            id: OfferId::new("OFF_1"),
            restaurant_id: RestaurantId::new("RID_1"),
            title: title.to_string(),
            description: description.map(str::to_string),
            price_cents: 29_900,
            original_price_cents: None,
            qty_left: 3,
            qty_total: 5,
            expires_at: None,
            archived_at: None,
            photo_url: None,
            created_at: created,
        }
    }

    #[test]
    fn header_only_for_no_offers() {
        assert_eq!(
            offers_csv(&[]),
            "id,title,description,price_cents,original_price_cents,qty_total,qty_left,expires_at,archived_at,created_at\r\n"
        );
    }

    #[test]
    fn nulls_are_empty_cells() {
        let csv = offers_csv(&[offer("Buns", None)]);
        let row = csv.lines().nth(1).unwrap_or_default();
        assert_eq!(row, "OFF_1,Buns,,29900,,5,3,,,2025-01-01T09:00:00+00:00");
    }

    #[test]
    fn special_characters_are_quoted() {
        let csv = offers_csv(&[offer("Buns, \"fresh\"", Some("two\nlines"))]);
        assert!(csv.contains("OFF_1,\"Buns, \"\"fresh\"\"\",\"two\nlines\",29900"));
    }
}
