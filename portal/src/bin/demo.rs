//! End-to-end demonstration of the portal against the in-memory stores.
//!
//! Walks the core scenarios: a sellout race between two buyers, partial
//! fulfillment, an admin capacity raise reopening sales, and cancellation
//! suppressing purchases.

use anyhow::Result;
use bandstand_core::catalog::{ConcertDraft, ConcertFilter};
use bandstand_core::status::ConcertStatus;
use bandstand_core::types::{Capacity, Money, Role};
use bandstand_portal::{Config, Portal};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Barrier;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let portal = Portal::in_memory();

    // Accounts
    let band = portal.accounts().register("the_borrow_checkers", Role::Band)?;
    let fan_a = portal.accounts().register("ticket_fiend", Role::Fan)?;
    let fan_b = portal.accounts().register("front_row_forever", Role::Fan)?;
    let admin = portal.accounts().register("ops", Role::Admin)?;

    // A ten-ticket show
    let concert = portal
        .create_concert(
            band.id,
            ConcertDraft {
                band_name: "The Borrow Checkers".to_string(),
                venue: "Main Hall".to_string(),
                starts_at: Utc::now() + Duration::days(30),
                ticket_price: Money::from_cents(2500),
                max_tickets: Some(Capacity::new(10)),
            },
        )
        .await?;
    tracing::info!(concert_id = %concert.id, "Created {} at {}", concert.band_name, concert.venue);

    // Two buyers race for 7 and 5 tickets of the 10 available
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for (buyer, quantity) in [(fan_a.id, 7_u32), (fan_b.id, 5)] {
        let portal = portal.clone();
        let barrier = barrier.clone();
        let concert_id = concert.id;
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            portal.purchase(buyer, concert_id, quantity).await
        }));
    }
    for handle in handles {
        let receipt = handle.await??;
        tracing::info!(
            buyer = %receipt.buyer_id,
            requested = receipt.requested,
            admitted = receipt.admitted,
            fulfillment = ?receipt.fulfillment,
            "Purchase settled"
        );
    }

    let snapshot = portal.get_availability(concert.id).await?;
    tracing::info!(
        sold = snapshot.sold,
        remaining = snapshot.remaining,
        status = %snapshot.status,
        "After the race"
    );

    // The admin adds a standing-room block; the show reopens
    let effective = portal
        .admin_set_capacity(admin.id, concert.id, Capacity::new(18), ConcertStatus::Scheduled)
        .await?;
    tracing::info!(status = %effective, "Capacity raised to 18");

    let receipt = portal.purchase(fan_b.id, concert.id, 3).await?;
    tracing::info!(admitted = receipt.admitted, "Reopened sale admitted");

    // Cancellation suppresses sales outright
    portal.admin_cancel(admin.id, concert.id).await?;
    match portal.purchase(fan_a.id, concert.id, 1).await {
        Err(error) => tracing::info!(%error, "Purchase after cancellation rejected"),
        Ok(_) => tracing::warn!("Purchase unexpectedly admitted on a cancelled concert"),
    }
    portal.admin_reinstate(admin.id, concert.id).await?;

    // Search and the fan shortlist
    let results = portal
        .search(ConcertFilter {
            band: Some("borrow".to_string()),
            ..ConcertFilter::default()
        })
        .await?;
    tracing::info!(matches = results.len(), "Search for 'borrow'");

    portal.add_selected(fan_a.id, concert.id).await?;
    let selected = portal.selected_concerts(fan_a.id).await?;
    tracing::info!(selected = selected.len(), "Fan shortlist");

    let snapshot = portal.get_availability(concert.id).await?;
    tracing::info!(
        max = snapshot.max_tickets,
        sold = snapshot.sold,
        remaining = snapshot.remaining,
        status = %snapshot.status,
        "Final state"
    );

    Ok(())
}
