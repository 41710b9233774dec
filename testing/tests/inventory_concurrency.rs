//! Inventory invariants under concurrent and randomized workloads.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use foody_core::store::OfferRepository;
use foody_core::{MarketError, Reservation};
use foody_testing::fixtures::{bakery, pastry_draft, test_market};
use foody_testing::properties::{LedgerOp, ledger_ops};
use proptest::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reserves_never_oversell() {
    let t = test_market();
    let creds = t.market.register(bakery()).await.unwrap();
    let offer = t
        .market
        .create_offer(&creds.restaurant_id, creds.api_key.expose(), pastry_draft(&t.clock, 10))
        .await
        .unwrap();

    let market = Arc::new(t.market.clone());
    let handles: Vec<_> = (0..50)
        .map(|i| {
            let market = Arc::clone(&market);
            let offer_id = offer.id.clone();
            tokio::spawn(async move { market.reserve(offer_id.as_str(), 1 + i % 3).await })
        })
        .collect();

    let mut reserved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(reservation) => reserved += reservation.qty,
            Err(err) => assert!(
                matches!(
                    err,
                    MarketError::InsufficientQuantity { .. } | MarketError::NotFound { .. }
                ),
                "unexpected error: {err:?}"
            ),
        }
    }

    let stored = t.store.find_offer(&offer.id).await.unwrap().unwrap();
    assert!(reserved <= 10);
    assert_eq!(stored.qty_left + reserved, 10);
    assert_eq!(t.store.held_quantity(&offer.id), reserved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_reserves_exceeding_stock_yield_one_success() {
    let t = test_market();
    let creds = t.market.register(bakery()).await.unwrap();
    let offer = t
        .market
        .create_offer(&creds.restaurant_id, creds.api_key.expose(), pastry_draft(&t.clock, 5))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        t.market.reserve(offer.id.as_str(), 3),
        t.market.reserve(offer.id.as_str(), 3)
    );
    assert!(a.is_ok() ^ b.is_ok());
    let err = a.err().or(b.err()).unwrap();
    assert_eq!(
        err,
        MarketError::InsufficientQuantity {
            requested: 3,
            available: 2
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancel_and_redeem_pick_one_winner() {
    let t = test_market();
    let creds = t.market.register(bakery()).await.unwrap();
    let offer = t
        .market
        .create_offer(&creds.restaurant_id, creds.api_key.expose(), pastry_draft(&t.clock, 1))
        .await
        .unwrap();
    let reservation = t.market.reserve(offer.id.as_str(), 1).await.unwrap();
    let code = reservation.code.as_str();

    let (cancel, redeem) = tokio::join!(
        t.market.cancel_reservation(code),
        t.market.redeem(&creds.restaurant_id, creds.api_key.expose(), code)
    );
    assert!(cancel.is_ok() ^ redeem.is_ok());
    let loser = cancel.err().or(redeem.err()).unwrap();
    assert_eq!(loser.kind(), "invalid_state");

    let stored = t.store.find_offer(&offer.id).await.unwrap().unwrap();
    let restored = t.store.held_quantity(&offer.id) == 0 && stored.qty_left == 1;
    let consumed = t.store.redeemed_quantity(&offer.id) == 1 && stored.qty_left == 0;
    assert!(restored ^ consumed);
}

fn run_workload(total: u32, ops: Vec<LedgerOp>) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

    runtime.block_on(async move {
        let t = test_market();
        let creds = t.market.register(bakery()).await.unwrap();
        let offer = t
            .market
            .create_offer(
                &creds.restaurant_id,
                creds.api_key.expose(),
                pastry_draft(&t.clock, i64::from(total)),
            )
            .await
            .unwrap();
        let mut open: Vec<Reservation> = Vec::new();

        for op in ops {
            match op {
                LedgerOp::Reserve(qty) => {
                    if let Ok(reservation) = t.market.reserve(offer.id.as_str(), qty).await {
                        open.push(reservation);
                    }
                }
                LedgerOp::Cancel(n) if !open.is_empty() => {
                    let reservation = open.remove(n % open.len());
                    t.market
                        .cancel_reservation(reservation.code.as_str())
                        .await
                        .unwrap();
                }
                LedgerOp::Redeem(n) if !open.is_empty() => {
                    let reservation = open.remove(n % open.len());
                    t.market
                        .redeem(
                            &creds.restaurant_id,
                            creds.api_key.expose(),
                            reservation.code.as_str(),
                        )
                        .await
                        .unwrap();
                }
                LedgerOp::Cancel(_) | LedgerOp::Redeem(_) => {}
            }

            let stored = t.store.find_offer(&offer.id).await.unwrap().unwrap();
            let held = t.store.held_quantity(&offer.id);
            let redeemed = t.store.redeemed_quantity(&offer.id);
            prop_assert!(stored.qty_left <= stored.qty_total);
            prop_assert_eq!(stored.qty_left + held + redeemed, total);
        }
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ledger_conservation_holds(total in 1_u32..20, ops in ledger_ops(40)) {
        run_workload(total, ops)?;
    }
}
