//! Facade-level tests: accounts, catalog, search, shortlist, and the
//! purchase/override flows wired through the portal.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bandstand_core::admission::PurchaseError;
use bandstand_core::catalog::{CatalogError, ConcertDraft, ConcertEdit, ConcertFilter};
use bandstand_core::status::ConcertStatus;
use bandstand_core::types::{Capacity, Concert, Money, Role, UserId};
use bandstand_portal::{Portal, ShortlistError};
use chrono::{Duration, Utc};

fn draft(band_name: &str, days_out: i64, capacity: u32) -> ConcertDraft {
    ConcertDraft {
        band_name: band_name.to_string(),
        venue: "Main Hall".to_string(),
        starts_at: Utc::now() + Duration::days(days_out),
        ticket_price: Money::from_cents(2000),
        max_tickets: Some(Capacity::new(capacity)),
    }
}

async fn portal_with_concert(capacity: u32) -> (Portal, UserId, Concert) {
    let portal = Portal::in_memory();
    let band = portal.accounts().register("band", Role::Band).unwrap();
    let concert = portal
        .create_concert(band.id, draft("The Borrow Checkers", 30, capacity))
        .await
        .unwrap();
    (portal, band.id, concert)
}

#[tokio::test]
async fn band_creates_and_lists_its_concerts() {
    let (portal, band_id, concert) = portal_with_concert(10).await;

    let owned = portal.my_concerts(band_id).await.unwrap();
    assert_eq!(owned, vec![concert]);
}

#[tokio::test]
async fn fans_cannot_create_concerts() {
    let portal = Portal::in_memory();
    let fan = portal.accounts().register("fan", Role::Fan).unwrap();

    let result = portal.create_concert(fan.id, draft("Imposters", 10, 5)).await;
    assert!(matches!(result, Err(CatalogError::Forbidden(_))));
}

#[tokio::test]
async fn default_capacity_is_one_hundred() {
    let portal = Portal::in_memory();
    let band = portal.accounts().register("band", Role::Band).unwrap();

    let concert = portal
        .create_concert(
            band.id,
            ConcertDraft {
                max_tickets: None,
                ..draft("Defaults", 5, 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(concert.max_tickets.value(), 100);
}

#[tokio::test]
async fn unregistered_buyers_are_rejected() {
    let (portal, _, concert) = portal_with_concert(10).await;

    let result = portal.purchase(UserId::new(), concert.id, 1).await;
    assert!(matches!(result, Err(PurchaseError::InvalidRequest(_))));
}

#[tokio::test]
async fn purchase_flows_through_to_availability() {
    let (portal, _, concert) = portal_with_concert(10).await;
    let fan = portal.accounts().register("fan", Role::Fan).unwrap();

    let receipt = portal.purchase(fan.id, concert.id, 4).await.unwrap();
    assert_eq!(receipt.admitted, 4);

    let snapshot = portal.get_availability(concert.id).await.unwrap();
    assert_eq!(snapshot.sold, 4);
    assert_eq!(snapshot.remaining, 6);
    assert_eq!(snapshot.status, ConcertStatus::Scheduled);
}

#[tokio::test]
async fn edit_cannot_resurrect_a_sold_out_concert() {
    let (portal, band_id, concert) = portal_with_concert(3).await;
    let fan = portal.accounts().register("fan", Role::Fan).unwrap();

    portal.purchase(fan.id, concert.id, 3).await.unwrap();

    // The owner submits "scheduled" without raising capacity; the ledger wins
    let edited = portal
        .edit_concert(
            band_id,
            concert.id,
            ConcertEdit {
                status: Some(ConcertStatus::Scheduled),
                ..ConcertEdit::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.status, ConcertStatus::Full);

    // Raising capacity through the same edit path reopens sales
    let edited = portal
        .edit_concert(
            band_id,
            concert.id,
            ConcertEdit {
                max_tickets: Some(Capacity::new(6)),
                status: Some(ConcertStatus::Scheduled),
                ..ConcertEdit::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.status, ConcertStatus::Scheduled);
}

#[tokio::test]
async fn strangers_cannot_edit_someone_elses_concert() {
    let (portal, _, concert) = portal_with_concert(10).await;
    let other_band = portal.accounts().register("other", Role::Band).unwrap();

    let result = portal
        .edit_concert(
            other_band.id,
            concert.id,
            ConcertEdit {
                venue: Some("Stolen Stage".to_string()),
                ..ConcertEdit::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CatalogError::Forbidden(_))));
}

#[tokio::test]
async fn admin_override_through_the_portal() {
    let (portal, _, concert) = portal_with_concert(5).await;
    let fan = portal.accounts().register("fan", Role::Fan).unwrap();
    let admin = portal.accounts().register("ops", Role::Admin).unwrap();

    portal.purchase(fan.id, concert.id, 5).await.unwrap();
    assert_eq!(
        portal.get_availability(concert.id).await.unwrap().status,
        ConcertStatus::Full
    );

    let effective = portal
        .admin_set_capacity(admin.id, concert.id, Capacity::new(8), ConcertStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(effective, ConcertStatus::Scheduled);

    let snapshot = portal.get_availability(concert.id).await.unwrap();
    assert_eq!(snapshot.remaining, 3);
}

#[tokio::test]
async fn search_filters_by_band_date_and_status() {
    let portal = Portal::in_memory();
    let band = portal.accounts().register("band", Role::Band).unwrap();
    let admin = portal.accounts().register("ops", Role::Admin).unwrap();

    let early = portal
        .create_concert(band.id, draft("The Borrow Checkers", 10, 10))
        .await
        .unwrap();
    let late = portal
        .create_concert(band.id, draft("Static Dispatch", 20, 10))
        .await
        .unwrap();
    portal.admin_cancel(admin.id, late.id).await.unwrap();

    // Case-insensitive substring on band name
    let results = portal
        .search(ConcertFilter {
            band: Some("BORROW".to_string()),
            ..ConcertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, early.id);

    // Calendar date
    let results = portal
        .search(ConcertFilter {
            on_date: Some(late.starts_at.date_naive()),
            ..ConcertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, late.id);

    // Status
    let results = portal
        .search(ConcertFilter {
            status: Some(ConcertStatus::Cancelled),
            ..ConcertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, late.id);

    // No filters: everything, ordered by start time
    let results = portal.search(ConcertFilter::default()).await.unwrap();
    assert_eq!(
        results.iter().map(|concert| concert.id).collect::<Vec<_>>(),
        vec![early.id, late.id]
    );
}

#[tokio::test]
async fn shortlist_is_fan_only_and_idempotent() {
    let (portal, band_id, concert) = portal_with_concert(10).await;
    let fan = portal.accounts().register("fan", Role::Fan).unwrap();

    // Bands don't keep shortlists
    let result = portal.add_selected(band_id, concert.id).await;
    assert!(matches!(result, Err(ShortlistError::Forbidden)));

    portal.add_selected(fan.id, concert.id).await.unwrap();
    portal.add_selected(fan.id, concert.id).await.unwrap();

    let selected = portal.selected_concerts(fan.id).await.unwrap();
    assert_eq!(selected.len(), 1);

    portal.remove_selected(fan.id, concert.id).unwrap();
    let selected = portal.selected_concerts(fan.id).await.unwrap();
    assert!(selected.is_empty());
}

#[tokio::test]
async fn shortlisting_a_missing_concert_fails() {
    let portal = Portal::in_memory();
    let fan = portal.accounts().register("fan", Role::Fan).unwrap();

    let result = portal
        .add_selected(fan.id, bandstand_core::types::ConcertId::new())
        .await;
    assert!(matches!(result, Err(ShortlistError::NotFound(_))));
}
