//! # Foody Testing
//!
//! Testing utilities for the Foody marketplace.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`SequentialIssuer`]: predictable identifiers and codes
//! - [`InMemoryMarketStore`]: a complete storage backend behind one mutex
//! - [`fixtures`]: a ready-wired [`fixtures::TestMarket`] and sample inputs
//! - [`properties`]: proptest strategies for domain inputs
//!
//! ## Example
//!
//! ```ignore
//! use foody_testing::fixtures::{bakery, test_market, pastry_draft};
//!
//! #[tokio::test]
//! async fn reserve_and_redeem() {
//!     let t = test_market();
//!     let creds = t.market.register(bakery()).await.unwrap();
//!     let offer = t.market
//!         .create_offer(&creds.restaurant_id, creds.api_key.expose(), pastry_draft(&t.clock, 5))
//!         .await
//!         .unwrap();
//!     let reservation = t.market.reserve(offer.id.as_str(), 1).await.unwrap();
//!     assert_eq!(reservation.code.as_str(), "RES_0000000000000004");
//! }
//! ```

pub mod fixtures;
pub mod memory;

use chrono::{DateTime, Utc};
use foody_core::environment::Clock;

/// Mock implementations of injected dependencies.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeDelta;
    use foody_core::issuer::{TokenIssuer, TokenKind};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, PoisonError, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until explicitly moved. Clones share the same
    /// time, so a test can hand one clone to the service and advance
    /// another.
    ///
    /// # Example
    ///
    /// ```
    /// use foody_testing::mocks::FixedClock;
    /// use foody_core::environment::Clock;
    /// use chrono::{TimeDelta, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// assert_eq!(time1, clock.now());
    ///
    /// clock.advance(TimeDelta::minutes(5));
    /// assert_eq!(clock.now() - time1, TimeDelta::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward (or backward, with a negative delta).
        pub fn advance(&self, delta: TimeDelta) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += delta;
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Issuer producing `<TAG>_<zero-padded counter>` tokens.
    ///
    /// A single counter is shared by all kinds, so every token issued by one
    /// instance is distinct. Suffix width matches the production issuer.
    #[derive(Debug, Default)]
    pub struct SequentialIssuer {
        next: AtomicU64,
    }

    impl SequentialIssuer {
        /// Create an issuer starting at zero.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl TokenIssuer for SequentialIssuer {
        fn issue(&self, kind: TokenKind) -> String {
            let n = self.next.fetch_add(1, Ordering::Relaxed);
            let width = kind.entropy_bytes() * 2;
            format!("{}_{n:0width$x}", kind.tag())
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step of a randomized inventory workload.
    #[derive(Clone, Debug)]
    pub enum LedgerOp {
        /// Reserve this many units.
        Reserve(u32),
        /// Cancel the n-th open reservation (modulo the number open).
        Cancel(usize),
        /// Redeem the n-th open reservation (modulo the number open).
        Redeem(usize),
    }

    /// Strategy for a single [`LedgerOp`].
    pub fn ledger_op() -> impl Strategy<Value = LedgerOp> {
        prop_oneof![
            3 => (1_u32..4).prop_map(LedgerOp::Reserve),
            1 => any::<usize>().prop_map(LedgerOp::Cancel),
            1 => any::<usize>().prop_map(LedgerOp::Redeem),
        ]
    }

    /// Strategy for a workload of up to `max_len` operations.
    pub fn ledger_ops(max_len: usize) -> impl Strategy<Value = Vec<LedgerOp>> {
        proptest::collection::vec(ledger_op(), 0..max_len)
    }

    /// Strategy for minutes-until-expiry spanning every discount tier.
    pub fn minutes_to_expiry() -> impl Strategy<Value = i64> {
        -60_i64..240
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "foody_core=debug".to_string()),
        ))
        .try_init();
}

// Re-export commonly used items
pub use memory::InMemoryMarketStore;
pub use mocks::{FixedClock, SequentialIssuer, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use foody_core::issuer::{TokenIssuer, TokenKind};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_fixed_clock_clones_share_time() {
        let clock = test_clock();
        let handle = clock.clone();
        handle.advance(TimeDelta::hours(1));
        assert_eq!(clock.now(), handle.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T01:00:00+00:00");
    }

    #[test]
    fn test_sequential_issuer() {
        let issuer = SequentialIssuer::new();
        assert_eq!(issuer.issue(TokenKind::Restaurant), "RID_000000000000");
        assert_eq!(
            issuer.issue(TokenKind::ApiKey),
            "KEY_00000000000000000000000000000001"
        );
        assert_eq!(issuer.issue(TokenKind::RedemptionCode), "RES_0000000000000002");
    }
}
