//! The admission controller: the purchase protocol.
//!
//! Decides whether and how much of a ticket request to admit, appends the
//! admitted quantity to the ledger, and keeps the concert's advertised
//! status in step with the sale that exhausted capacity.
//!
//! **Concurrency strategy**: optimistic concurrency on the per-concert
//! ledger. The whole resolve-clamp-append sequence runs against a single
//! observed [`LedgerVersion`]; a conflicting append restarts the sequence
//! under an exponential-backoff [`RetryPolicy`]. Two racing buyers can
//! therefore never both admit against the same remaining count — the race
//! the naive check-then-write implementation loses.

use crate::availability::{self, Availability};
use crate::catalog::{ConcertStore, ConcertStoreError};
use crate::environment::Clock;
use crate::ledger::{LedgerError, LedgerVersion, TicketLedger};
use crate::retry::RetryPolicy;
use crate::status::ConcertStatus;
use crate::types::{Concert, ConcertId, TicketSale, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// How completely a purchase request was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fulfillment {
    /// Every requested ticket was admitted
    Full,
    /// Fewer tickets than requested were admitted (capacity ran short)
    Partial,
}

/// Outcome of a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Concert purchased
    pub concert_id: ConcertId,
    /// Buyer account
    pub buyer_id: UserId,
    /// Quantity the buyer asked for
    pub requested: u32,
    /// Quantity actually admitted (`1 ..= requested`)
    pub admitted: u32,
    /// Whether the request was fully or partially satisfied
    pub fulfillment: Fulfillment,
    /// Concert status after this purchase
    pub status: ConcertStatus,
    /// When the purchase was admitted
    pub purchased_at: chrono::DateTime<chrono::Utc>,
}

/// Errors surfaced by the purchase protocol.
///
/// A failed purchase leaves the ledger and the concert record untouched.
/// Only [`PurchaseError::Conflict`] is retryable, and the controller has
/// already retried it under its policy before surfacing it.
#[derive(Error, Debug)]
pub enum PurchaseError {
    /// Malformed request (zero quantity). Caller error, not retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The concert does not exist.
    #[error("Concert not found: {0}")]
    NotFound(ConcertId),

    /// The concert is cancelled; purchases are suppressed regardless of
    /// remaining capacity until an admin reverses the cancellation.
    #[error("Concert {0} is cancelled")]
    Unavailable(ConcertId),

    /// No tickets remain at validation time.
    #[error("Concert {0} is sold out")]
    SoldOut(ConcertId),

    /// Concurrent-purchase contention persisted past the retry budget.
    #[error("Purchase conflict on concert {0}: retries exhausted")]
    Conflict(ConcertId),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ConcertStoreError> for PurchaseError {
    fn from(error: ConcertStoreError) -> Self {
        match error {
            ConcertStoreError::NotFound(id) => Self::NotFound(id),
            ConcertStoreError::Storage(message) => Self::Storage(message),
        }
    }
}

/// The admission controller.
///
/// Shared across concurrent purchase requests; per-concert serialization
/// comes from the ledger's optimistic concurrency, not from locking the
/// controller.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn ConcertStore>,
    ledger: Arc<dyn TicketLedger>,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
}

impl AdmissionController {
    /// Creates a new `AdmissionController` with the default retry policy.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConcertStore>,
        ledger: Arc<dyn TicketLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the conflict retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Purchase up to `requested_qty` tickets for a concert.
    ///
    /// Validation order: quantity, existence, cancellation, remaining
    /// capacity. The admitted quantity is `min(requested, remaining)` —
    /// a request exceeding remaining capacity is clamped, not rejected,
    /// and the receipt reports [`Fulfillment::Partial`]. The purchase that
    /// exhausts capacity flips the concert to `Full` before returning.
    ///
    /// On ledger contention the whole validate-clamp-append sequence is
    /// retried with backoff, so a concert cancelled or sold out mid-retry
    /// is seen by the rerun.
    ///
    /// # Errors
    ///
    /// See [`PurchaseError`]. No ledger entry is written on any failure
    /// path.
    pub async fn purchase(
        &self,
        concert_id: ConcertId,
        buyer_id: UserId,
        requested_qty: u32,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        if requested_qty == 0 {
            return Err(PurchaseError::InvalidRequest(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.try_purchase(concert_id, buyer_id, requested_qty).await {
                Err(PurchaseError::Conflict(id)) if attempt < self.retry_policy.max_retries => {
                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    attempt += 1;
                    tracing::debug!(
                        concert_id = %id,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Ledger conflict, retrying purchase"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(PurchaseError::Conflict(id)) => {
                    tracing::warn!(
                        concert_id = %id,
                        retries = self.retry_policy.max_retries,
                        "Purchase retries exhausted"
                    );
                    return Err(PurchaseError::Conflict(id));
                }
                outcome => return outcome,
            }
        }
    }

    /// One pass of the validate-clamp-append sequence.
    async fn try_purchase(
        &self,
        concert_id: ConcertId,
        buyer_id: UserId,
        requested_qty: u32,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let concert = self
            .store
            .get(concert_id)
            .await?
            .ok_or(PurchaseError::NotFound(concert_id))?;

        // Resolve availability and remember the version it was observed at;
        // the append below asserts it.
        let (version, sales) = self.ledger.load_sales(concert_id).await.map_err(storage)?;
        let sold = availability::tally(&sales);
        let snapshot = Availability::compute(&concert, sold);

        let admitted = decide(concert_id, &snapshot, requested_qty)?;

        let purchased_at = self.clock.now();
        let sale = TicketSale::new(concert_id, buyer_id, admitted, purchased_at);
        self.append(concert_id, version, sale).await?;

        let sold_after = sold + u64::from(admitted);
        let status = self.flip_if_sold_out(&concert, sold_after).await;

        let fulfillment = if admitted == requested_qty {
            Fulfillment::Full
        } else {
            Fulfillment::Partial
        };

        tracing::info!(
            concert_id = %concert_id,
            buyer_id = %buyer_id,
            requested = requested_qty,
            admitted,
            sold = sold_after,
            status = %status,
            "Purchase admitted"
        );

        Ok(PurchaseReceipt {
            concert_id,
            buyer_id,
            requested: requested_qty,
            admitted,
            fulfillment,
            status,
            purchased_at,
        })
    }

    async fn append(
        &self,
        concert_id: ConcertId,
        version: LedgerVersion,
        sale: TicketSale,
    ) -> Result<(), PurchaseError> {
        match self.ledger.append_sale(concert_id, version, sale).await {
            Ok(_) => Ok(()),
            Err(LedgerError::Conflict { .. }) => Err(PurchaseError::Conflict(concert_id)),
            Err(LedgerError::Storage(message)) => Err(PurchaseError::Storage(message)),
        }
    }

    /// Flip the cached status to `Full` when this purchase exhausted
    /// capacity. The flip is best-effort: the entry is already in the
    /// ledger, and every read and write path re-derives the status, so a
    /// failed cache write degrades freshness, not correctness.
    async fn flip_if_sold_out(&self, concert: &Concert, sold_after: u64) -> ConcertStatus {
        let derived = crate::status::derive(sold_after, concert.max_tickets.value());
        if derived == ConcertStatus::Full && concert.status != ConcertStatus::Full {
            let mut updated = concert.clone();
            updated.status = ConcertStatus::Full;
            if let Err(error) = self.store.update(updated).await {
                tracing::warn!(
                    concert_id = %concert.id,
                    %error,
                    "Failed to cache sold-out status; reads will re-derive"
                );
            }
        }
        derived
    }
}

fn storage(error: LedgerError) -> PurchaseError {
    match error {
        LedgerError::Conflict { concert_id, .. } => PurchaseError::Conflict(concert_id),
        LedgerError::Storage(message) => PurchaseError::Storage(message),
    }
}

/// Pure admission decision: how many tickets does a request admit?
///
/// Checks cancellation before capacity, then clamps the requested quantity
/// to the remaining count (partial fulfillment).
const fn decide(
    concert_id: ConcertId,
    snapshot: &Availability,
    requested: u32,
) -> Result<u32, PurchaseError> {
    if matches!(snapshot.status, ConcertStatus::Cancelled) {
        return Err(PurchaseError::Unavailable(concert_id));
    }
    if snapshot.remaining <= 0 {
        return Err(PurchaseError::SoldOut(concert_id));
    }

    // remaining is positive here and bounded by u32 capacity
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let available = snapshot.remaining as u32;
    Ok(if requested < available {
        requested
    } else {
        available
    })
}
