//! Reservation lifecycle.
//!
//! ```text
//! reserved ──cancel──▶ canceled
//!     │
//!     └────redeem────▶ redeemed
//! ```
//!
//! Both transitions are one-way; a second cancel or redeem on the same code
//! fails with [`MarketError::InvalidState`]. Coupling to the inventory ledger
//! (decrement on open, increment on cancel) is done by the storage backend in
//! the same atomic unit as the transition.

use chrono::{DateTime, Utc};

use crate::error::{MarketError, Result};
use crate::types::{
    Offer, RedemptionCode, Reservation, ReservationId, ReservationStatus, RestaurantId,
};

/// Who is allowed to cancel a reservation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelScope {
    /// Whoever holds the code. The code itself is the capability.
    Holder,
    /// A merchant; only reservations against its own offers are visible.
    Merchant(RestaurantId),
}

impl CancelScope {
    /// Whether the reservation is visible to this scope.
    #[must_use]
    pub fn admits(&self, reservation: &Reservation) -> bool {
        match self {
            Self::Holder => true,
            Self::Merchant(restaurant_id) => reservation.restaurant_id == *restaurant_id,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Holder => "holder",
            Self::Merchant(_) => "merchant",
        }
    }
}

/// Trim a caller-supplied code.
///
/// # Errors
///
/// Returns [`MarketError::InvalidInput`] if the code is blank.
pub fn parse_code(raw: &str) -> Result<RedemptionCode> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(MarketError::invalid_input("code required"));
    }
    Ok(RedemptionCode::new(code))
}

impl Reservation {
    /// A fresh `reserved` reservation for stock already taken from `offer`.
    #[must_use]
    pub fn open(
        id: ReservationId,
        code: RedemptionCode,
        offer: &Offer,
        qty: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            offer_id: offer.id.clone(),
            restaurant_id: offer.restaurant_id.clone(),
            qty,
            code,
            status: ReservationStatus::Reserved,
            created_at: now,
            canceled_at: None,
            redeemed_at: None,
        }
    }

    /// Transition `reserved -> canceled`.
    ///
    /// The caller must release [`Reservation::qty`] back to the offer.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidState`] unless the reservation is
    /// currently `reserved`.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_reserved("cancel")?;
        self.status = ReservationStatus::Canceled;
        self.canceled_at = Some(now);
        Ok(())
    }

    /// Transition `reserved -> redeemed`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidState`] unless the reservation is
    /// currently `reserved`.
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_reserved("redeem")?;
        self.status = ReservationStatus::Redeemed;
        self.redeemed_at = Some(now);
        Ok(())
    }

    /// Check the status/timestamp pairing of a record read from storage.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Internal`] when timestamps disagree with the
    /// status or the quantity is zero.
    pub fn check_consistency(&self) -> Result<()> {
        let consistent = self.qty > 0
            && match self.status {
                ReservationStatus::Reserved => {
                    self.canceled_at.is_none() && self.redeemed_at.is_none()
                }
                ReservationStatus::Canceled => {
                    self.canceled_at.is_some() && self.redeemed_at.is_none()
                }
                ReservationStatus::Redeemed => {
                    self.canceled_at.is_none() && self.redeemed_at.is_some()
                }
            };
        if consistent {
            Ok(())
        } else {
            Err(MarketError::internal(format!(
                "reservation {} has inconsistent state",
                self.id
            )))
        }
    }

    fn ensure_reserved(&self, action: &str) -> Result<()> {
        if self.status == ReservationStatus::Reserved {
            Ok(())
        } else {
            Err(MarketError::InvalidState(format!(
                "cannot {action} reservation in status '{}'",
                self.status
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::OfferId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 2, 10, 0, 0).unwrap()
    }

    fn reservation() -> Reservation {
        let offer = Offer {
            id: OfferId::new("OFF_1"),
            restaurant_id: RestaurantId::new("RID_1"),
            title: "Soup".to_string(),
            description: None,
            price_cents: 300,
            original_price_cents: None,
            qty_left: 4,
            qty_total: 5,
            expires_at: None,
            archived_at: None,
            photo_url: None,
            created_at: now(),
        };
        Reservation::open(
            ReservationId::new("RSV_1"),
            RedemptionCode::new("RES_1"),
            &offer,
            1,
            now(),
        )
    }

    #[test]
    fn open_binds_to_offer_restaurant() {
        let reservation = reservation();
        assert_eq!(reservation.status, ReservationStatus::Reserved);
        assert_eq!(reservation.restaurant_id.as_str(), "RID_1");
        reservation.check_consistency().unwrap();
    }

    #[test]
    fn cancel_is_terminal() {
        let mut reservation = reservation();
        reservation.cancel(now()).unwrap();
        assert_eq!(reservation.status, ReservationStatus::Canceled);
        assert_eq!(reservation.canceled_at, Some(now()));
        reservation.check_consistency().unwrap();

        assert_eq!(reservation.cancel(now()).unwrap_err().kind(), "invalid_state");
        assert_eq!(reservation.redeem(now()).unwrap_err().kind(), "invalid_state");
        assert_eq!(reservation.status, ReservationStatus::Canceled);
    }

    #[test]
    fn redeem_is_terminal() {
        let mut reservation = reservation();
        reservation.redeem(now()).unwrap();
        assert_eq!(reservation.redeemed_at, Some(now()));
        assert_eq!(reservation.redeem(now()).unwrap_err().kind(), "invalid_state");
        assert_eq!(reservation.cancel(now()).unwrap_err().kind(), "invalid_state");
        assert!(reservation.canceled_at.is_none());
    }

    #[test]
    fn inconsistent_rows_are_internal() {
        let mut reservation = reservation();
        reservation.redeemed_at = Some(now());
        assert_eq!(reservation.check_consistency().unwrap_err().kind(), "internal");
    }

    #[test]
    fn merchant_scope_hides_foreign_reservations() {
        let reservation = reservation();
        assert!(CancelScope::Holder.admits(&reservation));
        assert!(CancelScope::Merchant(RestaurantId::new("RID_1")).admits(&reservation));
        assert!(!CancelScope::Merchant(RestaurantId::new("RID_2")).admits(&reservation));
    }

    #[test]
    fn parse_code_trims() {
        assert_eq!(parse_code("  RES_ab ").unwrap().as_str(), "RES_ab");
        assert_eq!(parse_code("   ").unwrap_err().kind(), "invalid_input");
    }
}
