//! End-to-end tests for the admission protocol against the in-memory stores.
//!
//! Covers the purchase validation order, partial fulfillment, the sell-out
//! race, admin override re-derivation, and the no-oversell property under
//! both concurrency and arbitrary request sequences.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use bandstand_core::admin::AdminOverride;
use bandstand_core::admission::{AdmissionController, Fulfillment, PurchaseError};
use bandstand_core::catalog::{Catalog, ConcertStore};
use bandstand_core::ledger::{LedgerError, LedgerVersion, TicketLedger};
use bandstand_core::retry::RetryPolicy;
use bandstand_core::status::ConcertStatus;
use bandstand_core::types::{Actor, Capacity, Concert, ConcertId, Role, TicketSale, UserId};
use bandstand_testing::{InMemoryConcertStore, InMemoryTicketLedger, fixtures, test_clock};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;

struct Rig {
    store: Arc<InMemoryConcertStore>,
    ledger: Arc<InMemoryTicketLedger>,
    admission: AdmissionController,
    admin: AdminOverride,
    catalog: Catalog,
}

fn rig() -> Rig {
    let store = Arc::new(InMemoryConcertStore::new());
    let ledger = Arc::new(InMemoryTicketLedger::new());
    let clock = Arc::new(test_clock());

    Rig {
        store: store.clone(),
        ledger: ledger.clone(),
        admission: AdmissionController::new(store.clone(), ledger.clone(), clock.clone()),
        admin: AdminOverride::new(store.clone(), ledger.clone()),
        catalog: Catalog::new(store, ledger, clock),
    }
}

async fn seed(rig: &Rig, capacity: u32) -> Concert {
    let concert = fixtures::concert(UserId::new(), capacity);
    rig.store.insert(concert.clone()).await.unwrap();
    concert
}

async fn sold(rig: &Rig, concert_id: ConcertId) -> u64 {
    let (_, sales) = rig.ledger.load_sales(concert_id).await.unwrap();
    sales.iter().map(|sale| u64::from(sale.quantity)).sum()
}

#[tokio::test]
async fn purchase_admits_full_request() {
    let rig = rig();
    let concert = seed(&rig, 10).await;
    let buyer = UserId::new();

    let receipt = rig.admission.purchase(concert.id, buyer, 4).await.unwrap();

    assert_eq!(receipt.requested, 4);
    assert_eq!(receipt.admitted, 4);
    assert_eq!(receipt.fulfillment, Fulfillment::Full);
    assert_eq!(receipt.status, ConcertStatus::Scheduled);
    assert_eq!(sold(&rig, concert.id).await, 4);
}

#[tokio::test]
async fn zero_quantity_is_invalid_and_writes_nothing() {
    let rig = rig();
    let concert = seed(&rig, 10).await;

    let result = rig.admission.purchase(concert.id, UserId::new(), 0).await;

    assert!(matches!(result, Err(PurchaseError::InvalidRequest(_))));
    assert_eq!(sold(&rig, concert.id).await, 0);
}

#[tokio::test]
async fn unknown_concert_is_not_found() {
    let rig = rig();
    let result = rig
        .admission
        .purchase(ConcertId::new(), UserId::new(), 1)
        .await;
    assert!(matches!(result, Err(PurchaseError::NotFound(_))));
}

#[tokio::test]
async fn cancelled_concert_rejects_purchases_with_capacity_left() {
    let rig = rig();
    let concert = seed(&rig, 10).await;
    let owner = Actor::new(concert.owner, Role::Band);

    rig.admin.cancel(owner, concert.id).await.unwrap();
    let before = rig.store.get(concert.id).await.unwrap().unwrap();

    let result = rig.admission.purchase(concert.id, UserId::new(), 1).await;

    assert!(matches!(result, Err(PurchaseError::Unavailable(_))));
    // Ledger and record are byte-for-byte unchanged
    assert_eq!(sold(&rig, concert.id).await, 0);
    let after = rig.store.get(concert.id).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn sold_out_concert_rejects_purchases() {
    let rig = rig();
    let concert = seed(&rig, 3).await;

    rig.admission
        .purchase(concert.id, UserId::new(), 3)
        .await
        .unwrap();
    let result = rig.admission.purchase(concert.id, UserId::new(), 1).await;

    assert!(matches!(result, Err(PurchaseError::SoldOut(_))));
    assert_eq!(sold(&rig, concert.id).await, 3);
}

#[tokio::test]
async fn oversized_request_is_clamped_and_flips_status() {
    let rig = rig();
    let concert = seed(&rig, 10).await;

    rig.admission
        .purchase(concert.id, UserId::new(), 7)
        .await
        .unwrap();

    // 3 remain; asking for 5 admits 3 and sells the concert out
    let receipt = rig
        .admission
        .purchase(concert.id, UserId::new(), 5)
        .await
        .unwrap();

    assert_eq!(receipt.admitted, 3);
    assert_eq!(receipt.fulfillment, Fulfillment::Partial);
    assert_eq!(receipt.status, ConcertStatus::Full);

    let snapshot = rig.catalog.availability(concert.id).await.unwrap();
    assert_eq!(snapshot.sold, 10);
    assert_eq!(snapshot.remaining, 0);
    assert_eq!(snapshot.status, ConcertStatus::Full);

    // The stored record caught up too
    let stored = rig.store.get(concert.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ConcertStatus::Full);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_buyers_cannot_oversell_the_last_tickets() {
    // Capacity 10, concurrent requests for 7 and 5: exactly 10 admitted.
    let rig = rig();
    let concert = seed(&rig, 10).await;
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for quantity in [7_u32, 5] {
        let admission = rig.admission.clone();
        let barrier = barrier.clone();
        let concert_id = concert.id;
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            admission.purchase(concert_id, UserId::new(), quantity).await
        }));
    }

    let mut receipts = Vec::new();
    for handle in handles {
        receipts.push(handle.await.unwrap().unwrap());
    }

    let admitted_total: u32 = receipts.iter().map(|receipt| receipt.admitted).sum();
    assert_eq!(admitted_total, 10);
    assert_eq!(
        receipts
            .iter()
            .filter(|receipt| receipt.fulfillment == Fulfillment::Partial)
            .count(),
        1
    );
    assert_eq!(sold(&rig, concert.id).await, 10);

    let snapshot = rig.catalog.availability(concert.id).await.unwrap();
    assert_eq!(snapshot.status, ConcertStatus::Full);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn no_oversell_under_heavy_contention() {
    let rig = rig();
    let concert = seed(&rig, 10).await;
    let buyers = 16;
    let barrier = Arc::new(Barrier::new(buyers));

    // A generous budget: a conflict always means someone else made progress,
    // and at most ten appends can ever succeed.
    let policy = RetryPolicy {
        max_retries: 20,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(20),
        multiplier: 1.5,
    };

    let mut handles = Vec::new();
    for _ in 0..buyers {
        let admission = rig.admission.clone().with_retry_policy(policy.clone());
        let barrier = barrier.clone();
        let concert_id = concert.id;
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            admission.purchase(concert_id, UserId::new(), 3).await
        }));
    }

    let mut admitted_total = 0_u64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => admitted_total += u64::from(receipt.admitted),
            Err(PurchaseError::SoldOut(_)) => {}
            Err(other) => panic!("unexpected purchase error: {other}"),
        }
    }

    assert_eq!(admitted_total, 10);
    assert_eq!(sold(&rig, concert.id).await, 10);

    let snapshot = rig.catalog.availability(concert.id).await.unwrap();
    assert_eq!(snapshot.status, ConcertStatus::Full);
    assert_eq!(snapshot.remaining, 0);
}

#[tokio::test]
async fn capacity_raise_reopens_a_full_concert() {
    // Max 5, sold 5, full; raising to 8 reopens sales.
    let rig = rig();
    let concert = seed(&rig, 5).await;
    let owner = Actor::new(concert.owner, Role::Band);

    rig.admission
        .purchase(concert.id, UserId::new(), 5)
        .await
        .unwrap();

    let effective = rig
        .admin
        .set_capacity(owner, concert.id, Capacity::new(8), ConcertStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(effective, ConcertStatus::Scheduled);

    let snapshot = rig.catalog.availability(concert.id).await.unwrap();
    assert_eq!(snapshot.remaining, 3);
    assert_eq!(snapshot.status, ConcertStatus::Scheduled);
}

#[tokio::test]
async fn requested_scheduled_is_downgraded_while_sold_out() {
    let rig = rig();
    let concert = seed(&rig, 4).await;
    let admin = Actor::new(UserId::new(), Role::Admin);

    rig.admission
        .purchase(concert.id, UserId::new(), 4)
        .await
        .unwrap();

    // Admin asks for scheduled without raising capacity; the ledger wins
    let effective = rig
        .admin
        .set_capacity(admin, concert.id, Capacity::new(4), ConcertStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(effective, ConcertStatus::Full);
}

#[tokio::test]
async fn capacity_cut_below_sold_reads_full_and_blocks_sales() {
    let rig = rig();
    let concert = seed(&rig, 10).await;
    let admin = Actor::new(UserId::new(), Role::Admin);

    rig.admission
        .purchase(concert.id, UserId::new(), 8)
        .await
        .unwrap();

    let effective = rig
        .admin
        .set_capacity(admin, concert.id, Capacity::new(5), ConcertStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(effective, ConcertStatus::Full);

    let snapshot = rig.catalog.availability(concert.id).await.unwrap();
    assert_eq!(snapshot.remaining, -3);

    let result = rig.admission.purchase(concert.id, UserId::new(), 1).await;
    assert!(matches!(result, Err(PurchaseError::SoldOut(_))));

    // The existing entries were not invalidated
    assert_eq!(sold(&rig, concert.id).await, 8);
}

#[tokio::test]
async fn cancel_and_reinstate_round_trip() {
    let rig = rig();
    let concert = seed(&rig, 10).await;
    let admin = Actor::new(UserId::new(), Role::Admin);
    let buyer = UserId::new();

    rig.admission.purchase(concert.id, buyer, 2).await.unwrap();
    rig.admin.cancel(admin, concert.id).await.unwrap();

    let result = rig.admission.purchase(concert.id, buyer, 1).await;
    assert!(matches!(result, Err(PurchaseError::Unavailable(_))));

    let status = rig.admin.reinstate(admin, concert.id).await.unwrap();
    assert_eq!(status, ConcertStatus::Scheduled);

    let receipt = rig.admission.purchase(concert.id, buyer, 1).await.unwrap();
    assert_eq!(receipt.admitted, 1);
    assert_eq!(sold(&rig, concert.id).await, 3);
}

#[tokio::test]
async fn strangers_cannot_override() {
    let rig = rig();
    let concert = seed(&rig, 10).await;
    let stranger = Actor::new(UserId::new(), Role::Band);

    let result = rig
        .admin
        .set_capacity(stranger, concert.id, Capacity::new(20), ConcertStatus::Scheduled)
        .await;
    assert!(matches!(
        result,
        Err(bandstand_core::admin::OverrideError::Forbidden(_))
    ));
}

// ============================================================================
// Conflict retry behavior
// ============================================================================

/// Ledger decorator that rejects the first append with a conflict, as if a
/// concurrent purchase had just landed.
struct ContendedLedger {
    inner: InMemoryTicketLedger,
    contended: AtomicBool,
}

impl ContendedLedger {
    fn new() -> Self {
        Self {
            inner: InMemoryTicketLedger::new(),
            contended: AtomicBool::new(true),
        }
    }
}

impl TicketLedger for ContendedLedger {
    fn append_sale(
        &self,
        concert_id: ConcertId,
        expected_version: LedgerVersion,
        sale: TicketSale,
    ) -> Pin<Box<dyn Future<Output = Result<LedgerVersion, LedgerError>> + Send + '_>> {
        Box::pin(async move {
            if self.contended.swap(false, Ordering::SeqCst) {
                return Err(LedgerError::Conflict {
                    concert_id,
                    expected: expected_version,
                    actual: expected_version.next(),
                });
            }
            self.inner
                .append_sale(concert_id, expected_version, sale)
                .await
        })
    }

    fn load_sales(
        &self,
        concert_id: ConcertId,
    ) -> Pin<
        Box<
            dyn Future<Output = Result<(LedgerVersion, Vec<TicketSale>), LedgerError>> + Send + '_,
        >,
    > {
        self.inner.load_sales(concert_id)
    }
}

fn contended_rig() -> (Arc<InMemoryConcertStore>, Arc<ContendedLedger>) {
    (
        Arc::new(InMemoryConcertStore::new()),
        Arc::new(ContendedLedger::new()),
    )
}

#[tokio::test]
async fn conflict_is_retried_transparently() {
    let (store, ledger) = contended_rig();
    let concert = fixtures::concert(UserId::new(), 10);
    store.insert(concert.clone()).await.unwrap();

    let admission = AdmissionController::new(store, ledger, Arc::new(test_clock()))
        .with_retry_policy(RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        });

    let receipt = admission.purchase(concert.id, UserId::new(), 2).await.unwrap();
    assert_eq!(receipt.admitted, 2);
}

#[tokio::test]
async fn conflict_surfaces_once_retries_are_exhausted() {
    let (store, ledger) = contended_rig();
    let concert = fixtures::concert(UserId::new(), 10);
    store.insert(concert.clone()).await.unwrap();

    let admission = AdmissionController::new(store, ledger.clone(), Arc::new(test_clock()))
        .with_retry_policy(RetryPolicy::no_retries());

    let result = admission.purchase(concert.id, UserId::new(), 2).await;
    assert!(matches!(result, Err(PurchaseError::Conflict(_))));

    // The failed call left no entry behind
    let (version, sales) = ledger.load_sales(concert.id).await.unwrap();
    assert_eq!(version, LedgerVersion::INITIAL);
    assert!(sales.is_empty());
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// After any sequence of purchase requests, the sold total never
        /// exceeds capacity, and demand at or above capacity sells out
        /// exactly.
        #[test]
        fn no_oversell_for_any_request_sequence(
            capacity in 1u32..60,
            requests in proptest::collection::vec(1u32..=20, 1..40),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let rig = rig();
                let concert = seed(&rig, capacity).await;

                let mut admitted_total = 0_u64;
                for quantity in &requests {
                    match rig.admission.purchase(concert.id, UserId::new(), *quantity).await {
                        Ok(receipt) => {
                            assert!(receipt.admitted >= 1);
                            assert!(receipt.admitted <= *quantity);
                            admitted_total += u64::from(receipt.admitted);
                        }
                        Err(PurchaseError::SoldOut(_)) => {}
                        Err(other) => panic!("unexpected purchase error: {other}"),
                    }
                }

                let total = sold(&rig, concert.id).await;
                assert_eq!(total, admitted_total);
                assert!(total <= u64::from(capacity));

                let demand: u64 = requests.iter().map(|quantity| u64::from(*quantity)).sum();
                if demand >= u64::from(capacity) {
                    assert_eq!(total, u64::from(capacity));
                    let snapshot = rig.catalog.availability(concert.id).await.unwrap();
                    assert_eq!(snapshot.status, ConcertStatus::Full);
                }
            });
        }
    }
}
