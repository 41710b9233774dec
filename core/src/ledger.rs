//! Inventory ledger rules.
//!
//! These functions decide whether a quantity change is allowed and apply it
//! to an in-hand [`Offer`]. They do not provide atomicity themselves: each
//! storage backend runs them inside its own critical section (a row lock in
//! `PostgreSQL`, the store mutex in memory) so that concurrent reservations
//! on the same offer serialize.

use chrono::{DateTime, Utc};

use crate::error::{MarketError, Result};
use crate::types::Offer;

/// Take `qty` units from the offer's remaining stock.
///
/// Returns the quantity remaining afterwards.
///
/// # Errors
///
/// - [`MarketError::InvalidInput`] when `qty` is zero.
/// - [`MarketError::NotFound`] when the offer is not redeemable at `now`
///   (archived, expired, or sold out).
/// - [`MarketError::InsufficientQuantity`] when `qty` exceeds what is left.
///   The offer is left untouched.
pub fn reserve(offer: &mut Offer, qty: u32, now: DateTime<Utc>) -> Result<u32> {
    if qty == 0 {
        return Err(MarketError::invalid_input("qty must be at least 1"));
    }
    if !offer.is_redeemable(now) {
        return Err(MarketError::not_found("offer", offer.id.as_str()));
    }
    if qty > offer.qty_left {
        return Err(MarketError::InsufficientQuantity {
            requested: qty,
            available: offer.qty_left,
        });
    }
    offer.qty_left -= qty;
    Ok(offer.qty_left)
}

/// Return `qty` units to the offer's remaining stock.
///
/// Archived and expired offers still take their stock back. The result is
/// capped at `qty_total`; a release that would overflow it is logged.
pub fn release(offer: &mut Offer, qty: u32) -> u32 {
    let restored = offer.qty_left.saturating_add(qty);
    if restored > offer.qty_total {
        tracing::warn!(
            offer_id = %offer.id,
            qty_left = offer.qty_left,
            qty_total = offer.qty_total,
            released = qty,
            "release exceeds total quantity, capping"
        );
    }
    offer.qty_left = restored.min(offer.qty_total);
    offer.qty_left
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{OfferId, RestaurantId};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    fn offer(qty_left: u32, qty_total: u32) -> Offer {
        Offer {
            id: OfferId::new("OFF_a1"),
            restaurant_id: RestaurantId::new("RID_a1"),
            title: "Bagels".to_string(),
            description: None,
            price_cents: 10_000,
            original_price_cents: None,
            qty_left,
            qty_total,
            expires_at: Some(now() + Duration::hours(3)),
            archived_at: None,
            photo_url: None,
            created_at: now(),
        }
    }

    #[test]
    fn reserve_decrements() {
        let mut offer = offer(5, 5);
        assert_eq!(reserve(&mut offer, 2, now()).unwrap(), 3);
        assert_eq!(offer.qty_left, 3);
    }

    #[test]
    fn reserve_all_remaining_then_sold_out_is_not_found() {
        let mut offer = offer(2, 5);
        assert_eq!(reserve(&mut offer, 2, now()).unwrap(), 0);
        let err = reserve(&mut offer, 1, now()).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn reserve_more_than_left_leaves_stock_unchanged() {
        let mut offer = offer(5, 5);
        let err = reserve(&mut offer, 6, now()).unwrap_err();
        assert_eq!(
            err,
            MarketError::InsufficientQuantity {
                requested: 6,
                available: 5
            }
        );
        assert_eq!(offer.qty_left, 5);
    }

    #[test]
    fn reserve_zero_is_invalid() {
        let mut offer = offer(5, 5);
        assert_eq!(reserve(&mut offer, 0, now()).unwrap_err().kind(), "invalid_input");
    }

    #[test]
    fn reserve_against_archived_or_expired_is_not_found() {
        let mut archived = offer(5, 5);
        archived.archived_at = Some(now());
        assert_eq!(reserve(&mut archived, 1, now()).unwrap_err().kind(), "not_found");
        assert_eq!(archived.qty_left, 5);

        let mut expired = offer(5, 5);
        expired.expires_at = Some(now() - Duration::minutes(1));
        assert_eq!(reserve(&mut expired, 1, now()).unwrap_err().kind(), "not_found");
    }

    #[test]
    fn release_restores_even_when_archived() {
        let mut offer = offer(1, 5);
        offer.archived_at = Some(now());
        assert_eq!(release(&mut offer, 3), 4);
    }

    #[test]
    fn release_is_capped_at_total() {
        let mut offer = offer(4, 5);
        assert_eq!(release(&mut offer, 3), 5);
    }

    proptest! {
        #[test]
        fn reserve_then_release_conserves_stock(
            total in 1_u32..500,
            picks in proptest::collection::vec(1_u32..20, 0..40),
        ) {
            let mut offer = offer(total, total);
            let mut held = Vec::new();
            for qty in picks {
                if reserve(&mut offer, qty, now()).is_ok() {
                    held.push(qty);
                }
                let held_sum: u32 = held.iter().sum();
                prop_assert_eq!(offer.qty_left + held_sum, total);
            }
            for qty in held {
                release(&mut offer, qty);
            }
            prop_assert_eq!(offer.qty_left, total);
        }
    }
}
