//! Concert catalog: creation, editing, lookup, and search.
//!
//! The catalog stores what bands submit — the only rule it enforces beyond
//! field validation is ownership, plus the one invariant it shares with the
//! admission path: a caller-supplied status value is never trusted, it is
//! re-derived against the sales ledger before being stored.

use crate::availability::{self, Availability};
use crate::environment::Clock;
use crate::ledger::{LedgerError, TicketLedger};
use crate::status::{self, ConcertStatus};
use crate::types::{Actor, Capacity, Concert, ConcertId, Money, Role, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Longest accepted band or venue name.
const MAX_NAME_LEN: usize = 200;

/// Errors that can occur in the concert record store.
#[derive(Error, Debug)]
pub enum ConcertStoreError {
    /// No concert with the given id exists.
    #[error("Concert not found: {0}")]
    NotFound(ConcertId),

    /// Storage backend failure.
    #[error("Concert store error: {0}")]
    Storage(String),
}

/// Persistence for concert records.
///
/// The store holds the mutable side of the data model (`max_tickets`,
/// `ticket_price`, cached `status`); the immutable sales history lives in
/// the [`TicketLedger`]. Methods return `Pin<Box<dyn Future>>` so the trait
/// stays usable as `Arc<dyn ConcertStore>`.
pub trait ConcertStore: Send + Sync {
    /// Insert a new concert record.
    ///
    /// # Errors
    ///
    /// Returns [`ConcertStoreError::Storage`] on backend failure.
    fn insert(
        &self,
        concert: Concert,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConcertStoreError>> + Send + '_>>;

    /// Fetch a concert by id; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConcertStoreError::Storage`] on backend failure.
    fn get(
        &self,
        id: ConcertId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Concert>, ConcertStoreError>> + Send + '_>>;

    /// Replace an existing concert record.
    ///
    /// # Errors
    ///
    /// - [`ConcertStoreError::NotFound`]: the concert does not exist
    /// - [`ConcertStoreError::Storage`]: backend failure
    fn update(
        &self,
        concert: Concert,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConcertStoreError>> + Send + '_>>;

    /// List all concert records (unordered).
    ///
    /// # Errors
    ///
    /// Returns [`ConcertStoreError::Storage`] on backend failure.
    fn list(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Concert>, ConcertStoreError>> + Send + '_>>;
}

/// Errors surfaced by catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No concert with the given id exists.
    #[error("Concert not found: {0}")]
    NotFound(ConcertId),

    /// The actor is not allowed to perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A submitted field failed validation.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ConcertStoreError> for CatalogError {
    fn from(error: ConcertStoreError) -> Self {
        match error {
            ConcertStoreError::NotFound(id) => Self::NotFound(id),
            ConcertStoreError::Storage(message) => Self::Storage(message),
        }
    }
}

impl From<LedgerError> for CatalogError {
    fn from(error: LedgerError) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Fields for creating a concert.
#[derive(Debug, Clone)]
pub struct ConcertDraft {
    /// Performing band name
    pub band_name: String,
    /// Venue name
    pub venue: String,
    /// Scheduled date and time
    pub starts_at: DateTime<Utc>,
    /// Price per ticket
    pub ticket_price: Money,
    /// Ticket capacity; defaults to [`Capacity::DEFAULT`] when omitted
    pub max_tickets: Option<Capacity>,
}

/// Fields for editing a concert. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConcertEdit {
    /// New band name
    pub band_name: Option<String>,
    /// New venue name
    pub venue: Option<String>,
    /// New date and time
    pub starts_at: Option<DateTime<Utc>>,
    /// New ticket price
    pub ticket_price: Option<Money>,
    /// New capacity
    pub max_tickets: Option<Capacity>,
    /// Requested status; re-derived against the ledger before being stored
    pub status: Option<ConcertStatus>,
}

/// Search filters, all optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ConcertFilter {
    /// Case-insensitive band name substring
    pub band: Option<String>,
    /// Calendar date the concert starts on
    pub on_date: Option<NaiveDate>,
    /// Exact status match
    pub status: Option<ConcertStatus>,
}

/// The concert catalog service.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn ConcertStore>,
    ledger: Arc<dyn TicketLedger>,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    /// Creates a new `Catalog`
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
        }
    }

    /// Create a concert owned by the acting band account.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Forbidden`]: the actor is not a band account
    /// - [`CatalogError::InvalidField`]: empty or oversized name/venue,
    ///   zero capacity
    /// - [`CatalogError::Storage`]: backend failure
    pub async fn create(&self, actor: Actor, draft: ConcertDraft) -> Result<Concert, CatalogError> {
        if actor.role != Role::Band {
            return Err(CatalogError::Forbidden("Band access required".to_string()));
        }

        validate_name("band name", &draft.band_name)?;
        validate_name("venue", &draft.venue)?;
        let max_tickets = draft.max_tickets.unwrap_or_default();
        validate_capacity(max_tickets)?;

        let concert = Concert::new(
            ConcertId::new(),
            draft.band_name,
            draft.venue,
            draft.starts_at,
            draft.ticket_price,
            max_tickets,
            actor.id,
            self.clock.now(),
        );

        self.store.insert(concert.clone()).await?;
        tracing::info!(
            concert_id = %concert.id,
            band = %concert.band_name,
            capacity = concert.max_tickets.value(),
            "Concert created"
        );
        Ok(concert)
    }

    /// Edit a concert. Owner or admin only.
    ///
    /// The status actually stored is [`status::resolve_requested`] applied
    /// to the requested value (or the current one when omitted) against the
    /// live sold total, so a capacity raise reopens sales and a stale
    /// "scheduled" cannot resurrect a sold-out concert.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`]: unknown concert
    /// - [`CatalogError::Forbidden`]: the actor neither owns the concert nor
    ///   is an admin
    /// - [`CatalogError::InvalidField`]: a submitted field failed validation
    /// - [`CatalogError::Storage`]: backend failure
    pub async fn edit(
        &self,
        actor: Actor,
        id: ConcertId,
        edit: ConcertEdit,
    ) -> Result<Concert, CatalogError> {
        let mut concert = self
            .store
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        if !actor.may_manage(&concert) {
            return Err(CatalogError::Forbidden(
                "You can only edit your own concerts".to_string(),
            ));
        }

        if let Some(band_name) = edit.band_name {
            validate_name("band name", &band_name)?;
            concert.band_name = band_name;
        }
        if let Some(venue) = edit.venue {
            validate_name("venue", &venue)?;
            concert.venue = venue;
        }
        if let Some(starts_at) = edit.starts_at {
            concert.starts_at = starts_at;
        }
        if let Some(ticket_price) = edit.ticket_price {
            concert.ticket_price = ticket_price;
        }
        if let Some(max_tickets) = edit.max_tickets {
            validate_capacity(max_tickets)?;
            concert.max_tickets = max_tickets;
        }

        let (_, sales) = self.ledger.load_sales(id).await?;
        let sold = availability::tally(&sales);
        let requested = edit.status.unwrap_or(concert.status);
        concert.status = status::resolve_requested(requested, sold, concert.max_tickets.value());

        self.store.update(concert.clone()).await?;
        tracing::info!(
            concert_id = %concert.id,
            status = %concert.status,
            capacity = concert.max_tickets.value(),
            "Concert updated"
        );
        Ok(concert)
    }

    /// Fetch a concert by id.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`]: unknown concert
    /// - [`CatalogError::Storage`]: backend failure
    pub async fn get(&self, id: ConcertId) -> Result<Concert, CatalogError> {
        self.store
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// List concerts owned by a band, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] on backend failure.
    pub async fn list_owned(&self, owner: UserId) -> Result<Vec<Concert>, CatalogError> {
        let mut concerts: Vec<Concert> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|concert| concert.owner == owner)
            .collect();
        concerts.sort_by_key(|concert| concert.starts_at);
        Ok(concerts)
    }

    /// Search concerts with the given filters, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] on backend failure.
    pub async fn search(&self, filter: ConcertFilter) -> Result<Vec<Concert>, CatalogError> {
        let band_query = filter.band.map(|band| band.to_lowercase());

        let mut concerts: Vec<Concert> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|concert| {
                band_query
                    .as_ref()
                    .is_none_or(|band| concert.band_name.to_lowercase().contains(band))
                    && filter
                        .on_date
                        .is_none_or(|date| concert.starts_at.date_naive() == date)
                    && filter.status.is_none_or(|status| concert.status == status)
            })
            .collect();
        concerts.sort_by_key(|concert| concert.starts_at);
        Ok(concerts)
    }

    /// Availability snapshot for a concert: capacity, sold, remaining, and
    /// the effective status.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`]: unknown concert
    /// - [`CatalogError::Storage`]: backend failure
    pub async fn availability(&self, id: ConcertId) -> Result<Availability, CatalogError> {
        let concert = self.get(id).await?;
        let (_, sales) = self.ledger.load_sales(id).await?;
        Ok(Availability::compute(&concert, availability::tally(&sales)))
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidField(format!(
            "{field} cannot be empty"
        )));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(CatalogError::InvalidField(format!(
            "{field} too long: {} characters (max {MAX_NAME_LEN})",
            value.len()
        )));
    }
    Ok(())
}

fn validate_capacity(capacity: Capacity) -> Result<(), CatalogError> {
    if capacity.value() == 0 {
        return Err(CatalogError::InvalidField(
            "Capacity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert!(validate_name("band name", "The Borrow Checkers").is_ok());
        assert!(validate_name("band name", "   ").is_err());
        assert!(validate_name("venue", &"x".repeat(201)).is_err());
    }

    #[test]
    fn capacity_validation() {
        assert!(validate_capacity(Capacity::new(1)).is_ok());
        assert!(validate_capacity(Capacity::new(0)).is_err());
    }
}
