//! Administrative overrides: capacity, price, cancellation.
//!
//! Overrides never bypass the status derivation: a requested status is
//! resolved against the live sold total through the same rule the admission
//! controller uses, so the cached status and the sales ledger cannot
//! diverge. Lowering capacity below the sold total is permitted — it reads
//! as `Full` with negative remaining and never invalidates ledger entries.

use crate::availability;
use crate::catalog::{ConcertStore, ConcertStoreError};
use crate::ledger::{LedgerError, TicketLedger};
use crate::status::{self, ConcertStatus};
use crate::types::{Actor, Capacity, ConcertId, Money};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by override operations.
#[derive(Error, Debug)]
pub enum OverrideError {
    /// No concert with the given id exists.
    #[error("Concert not found: {0}")]
    NotFound(ConcertId),

    /// The actor neither owns the concert nor is an admin.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Capacity must be positive.
    #[error("Capacity must be greater than zero")]
    InvalidCapacity,

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ConcertStoreError> for OverrideError {
    fn from(error: ConcertStoreError) -> Self {
        match error {
            ConcertStoreError::NotFound(id) => Self::NotFound(id),
            ConcertStoreError::Storage(message) => Self::Storage(message),
        }
    }
}

impl From<LedgerError> for OverrideError {
    fn from(error: LedgerError) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Administrative override operations on a concert's inventory settings.
#[derive(Clone)]
pub struct AdminOverride {
    store: Arc<dyn ConcertStore>,
    ledger: Arc<dyn TicketLedger>,
}

impl AdminOverride {
    /// Creates a new `AdminOverride`
    #[must_use]
    pub fn new(store: Arc<dyn ConcertStore>, ledger: Arc<dyn TicketLedger>) -> Self {
        Self { store, ledger }
    }

    /// Change a concert's capacity and request a status value.
    ///
    /// Returns the effective status after re-derivation: `cancelled` always
    /// wins, and a requested `scheduled` is forced to `full` while
    /// `sold >= max_tickets` — even when the admin just asked otherwise.
    ///
    /// # Errors
    ///
    /// - [`OverrideError::NotFound`]: unknown concert
    /// - [`OverrideError::Forbidden`]: actor is neither owner nor admin
    /// - [`OverrideError::InvalidCapacity`]: zero capacity
    /// - [`OverrideError::Storage`]: backend failure
    pub async fn set_capacity(
        &self,
        actor: Actor,
        concert_id: ConcertId,
        max_tickets: Capacity,
        requested_status: ConcertStatus,
    ) -> Result<ConcertStatus, OverrideError> {
        if max_tickets.value() == 0 {
            return Err(OverrideError::InvalidCapacity);
        }

        let mut concert = self.load_managed(actor, concert_id).await?;

        let (_, sales) = self.ledger.load_sales(concert_id).await?;
        let sold = availability::tally(&sales);
        let effective = status::resolve_requested(requested_status, sold, max_tickets.value());

        concert.max_tickets = max_tickets;
        concert.status = effective;
        self.store.update(concert).await?;

        tracing::info!(
            concert_id = %concert_id,
            capacity = max_tickets.value(),
            sold,
            requested = %requested_status,
            effective = %effective,
            "Capacity override applied"
        );
        Ok(effective)
    }

    /// Change a concert's ticket price. Existing ledger entries keep the
    /// price they were sold at implicitly — the ledger stores quantities,
    /// not amounts.
    ///
    /// # Errors
    ///
    /// - [`OverrideError::NotFound`]: unknown concert
    /// - [`OverrideError::Forbidden`]: actor is neither owner nor admin
    /// - [`OverrideError::Storage`]: backend failure
    pub async fn set_price(
        &self,
        actor: Actor,
        concert_id: ConcertId,
        ticket_price: Money,
    ) -> Result<(), OverrideError> {
        let mut concert = self.load_managed(actor, concert_id).await?;
        concert.ticket_price = ticket_price;
        self.store.update(concert).await?;
        tracing::info!(concert_id = %concert_id, price = %ticket_price, "Price updated");
        Ok(())
    }

    /// Cancel a concert. Always permitted for a manager, independent of
    /// capacity state; suppresses all future purchases until reversed.
    ///
    /// # Errors
    ///
    /// - [`OverrideError::NotFound`]: unknown concert
    /// - [`OverrideError::Forbidden`]: actor is neither owner nor admin
    /// - [`OverrideError::Storage`]: backend failure
    pub async fn cancel(
        &self,
        actor: Actor,
        concert_id: ConcertId,
    ) -> Result<ConcertStatus, OverrideError> {
        let mut concert = self.load_managed(actor, concert_id).await?;
        concert.status = ConcertStatus::Cancelled;
        self.store.update(concert).await?;
        tracing::info!(concert_id = %concert_id, "Concert cancelled");
        Ok(ConcertStatus::Cancelled)
    }

    /// Reverse a cancellation. The concert returns to whichever of
    /// `scheduled`/`full` the ledger supports.
    ///
    /// # Errors
    ///
    /// - [`OverrideError::NotFound`]: unknown concert
    /// - [`OverrideError::Forbidden`]: actor is neither owner nor admin
    /// - [`OverrideError::Storage`]: backend failure
    pub async fn reinstate(
        &self,
        actor: Actor,
        concert_id: ConcertId,
    ) -> Result<ConcertStatus, OverrideError> {
        let mut concert = self.load_managed(actor, concert_id).await?;

        let (_, sales) = self.ledger.load_sales(concert_id).await?;
        let sold = availability::tally(&sales);
        let effective = status::derive(sold, concert.max_tickets.value());

        concert.status = effective;
        self.store.update(concert).await?;
        tracing::info!(concert_id = %concert_id, status = %effective, "Concert reinstated");
        Ok(effective)
    }

    async fn load_managed(
        &self,
        actor: Actor,
        concert_id: ConcertId,
    ) -> Result<crate::types::Concert, OverrideError> {
        let concert = self
            .store
            .get(concert_id)
            .await?
            .ok_or(OverrideError::NotFound(concert_id))?;

        if !actor.may_manage(&concert) {
            return Err(OverrideError::Forbidden(
                "Only the owning band or an admin may override a concert".to_string(),
            ));
        }
        Ok(concert)
    }
}
