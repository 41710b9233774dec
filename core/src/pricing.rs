//! Time-based dynamic pricing.
//!
//! An offer with an original (pre-discount) price gets cheaper as its expiry
//! approaches. Tiers are matched by ascending remaining time, first match
//! wins:
//!
//! | remaining time        | discount off original |
//! |-----------------------|-----------------------|
//! | `<= 0` (expired)      | none, base price      |
//! | `<= 30 min`           | 70%                   |
//! | `<= 60 min`           | 50%                   |
//! | `<= 120 min`          | 30%                   |
//! | `> 120 min` or no expiry | none, base price   |
//!
//! Discounted prices are rounded half-up using integer arithmetic and are
//! never persisted: every read recomputes them from the clock.

use chrono::{DateTime, TimeDelta, Utc};

/// Discount tiers as `(upper bound in minutes, percent off)`.
const TIERS: [(i64, u8); 3] = [(30, 70), (60, 50), (120, 30)];

/// Discount percent applicable at `now` for an offer expiring at `expires_at`.
///
/// Returns `0` when there is no expiry, when the expiry has been reached, or
/// when more than two hours remain.
#[must_use]
pub fn discount_percent(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u8 {
    let Some(expires_at) = expires_at else {
        return 0;
    };
    let remaining = expires_at - now;
    if remaining <= TimeDelta::zero() {
        return 0;
    }
    TIERS
        .iter()
        .find(|(minutes, _)| remaining <= TimeDelta::minutes(*minutes))
        .map_or(0, |(_, percent)| *percent)
}

/// Price the buyer pays at `now`, in minor units.
///
/// Offers without a positive original price always sell at `base_price`.
/// Otherwise the current tier's discount is applied to the original price;
/// outside the discount window the base price applies.
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use foody_core::pricing::effective_price;
///
/// let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
/// let expires = now + Duration::minutes(110);
/// assert_eq!(effective_price(29_900, Some(34_900), Some(expires), now), 24_430);
/// ```
#[must_use]
pub fn effective_price(
    base_price: i64,
    original_price: Option<i64>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let Some(original) = original_price.filter(|original| *original > 0) else {
        return base_price;
    };
    match discount_percent(expires_at, now) {
        0 => base_price,
        percent => apply_discount(original, percent),
    }
}

/// `round_half_up(original * (100 - percent) / 100)`, floored at zero.
fn apply_discount(original: i64, percent: u8) -> i64 {
    let keep = i64::from(100_u8.saturating_sub(percent));
    original
        .saturating_mul(keep)
        .saturating_add(50)
        .checked_div(100)
        .unwrap_or_default()
        .max(0)
}

/// Convert an amount in major units (e.g. `199.5`) to minor units (`19950`).
///
/// Rounds half away from zero. Returns `None` for NaN, infinities and values
/// outside the `i64` range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn cents_from_major(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    let cents = (amount * 100.0).round();
    if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap()
    }

    fn in_minutes(minutes: i64) -> Option<DateTime<Utc>> {
        Some(now() + Duration::minutes(minutes))
    }

    #[test]
    fn deterministic_example_at_110_minutes() {
        assert_eq!(discount_percent(in_minutes(110), now()), 30);
        assert_eq!(
            effective_price(29_900, Some(34_900), in_minutes(110), now()),
            24_430
        );
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(discount_percent(in_minutes(120), now()), 30);
        assert_eq!(discount_percent(in_minutes(60), now()), 50);
        assert_eq!(discount_percent(in_minutes(30), now()), 70);
    }

    #[test]
    fn just_past_two_hours_is_not_discounted() {
        let expires = now() + Duration::minutes(120) + Duration::milliseconds(600);
        assert_eq!(discount_percent(Some(expires), now()), 0);
        assert_eq!(
            effective_price(29_900, Some(34_900), Some(expires), now()),
            29_900
        );

        let expires = now() + Duration::minutes(120) + Duration::nanoseconds(1);
        assert_eq!(discount_percent(Some(expires), now()), 0);
    }

    #[test]
    fn expired_or_unset_expiry_is_not_discounted() {
        assert_eq!(discount_percent(in_minutes(0), now()), 0);
        assert_eq!(discount_percent(in_minutes(-5), now()), 0);
        assert_eq!(discount_percent(None, now()), 0);
        assert_eq!(effective_price(500, Some(1_000), in_minutes(0), now()), 500);
        assert_eq!(effective_price(500, Some(1_000), None, now()), 500);
    }

    #[test]
    fn no_or_non_positive_original_uses_base() {
        assert_eq!(effective_price(500, None, in_minutes(10), now()), 500);
        assert_eq!(effective_price(500, Some(0), in_minutes(10), now()), 500);
        assert_eq!(effective_price(500, Some(-1), in_minutes(10), now()), 500);
    }

    #[test]
    fn discount_rounds_half_up() {
        // 15 * 0.3 = 4.5 -> 5
        assert_eq!(effective_price(0, Some(15), in_minutes(20), now()), 5);
        // 1 * 0.5 = 0.5 -> 1
        assert_eq!(effective_price(0, Some(1), in_minutes(45), now()), 1);
        // 34900 * 0.3 = 10470 exactly
        assert_eq!(effective_price(0, Some(34_900), in_minutes(30), now()), 10_470);
    }

    #[test]
    fn cents_from_major_rounds_and_rejects_non_finite() {
        assert_eq!(cents_from_major(199.0), Some(19_900));
        assert_eq!(cents_from_major(199.5), Some(19_950));
        assert_eq!(cents_from_major(0.125), Some(13));
        assert_eq!(cents_from_major(-1.5), Some(-150));
        assert_eq!(cents_from_major(f64::NAN), None);
        assert_eq!(cents_from_major(f64::INFINITY), None);
        assert_eq!(cents_from_major(1e30), None);
    }

    proptest! {
        #[test]
        fn pricing_is_deterministic(
            base in 0_i64..1_000_000,
            original in proptest::option::of(0_i64..1_000_000),
            minutes in -300_i64..300,
        ) {
            let expires = in_minutes(minutes);
            prop_assert_eq!(
                effective_price(base, original, expires, now()),
                effective_price(base, original, expires, now())
            );
        }

        #[test]
        fn discounted_price_never_exceeds_original(
            base in 0_i64..1_000_000,
            original in 1_i64..1_000_000,
            minutes in 1_i64..=120,
        ) {
            let price = effective_price(base, Some(original), in_minutes(minutes), now());
            prop_assert!(price >= 0);
            prop_assert!(price <= original);
        }

        #[test]
        fn outside_window_price_is_base(
            base in 0_i64..1_000_000,
            original in proptest::option::of(0_i64..1_000_000),
            minutes in prop_oneof![-10_000_i64..=0, 121_i64..10_000],
        ) {
            prop_assert_eq!(effective_price(base, original, in_minutes(minutes), now()), base);
        }
    }
}
