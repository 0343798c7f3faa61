//! The portal facade: one wiring point for accounts, catalog, admission,
//! overrides, and the fan shortlist.

use crate::accounts::{AccountError, AccountRegistry};
use crate::config::DatabaseConfig;
use crate::selected::{Shortlist, ShortlistError};
use bandstand_core::admin::{AdminOverride, OverrideError};
use bandstand_core::admission::{AdmissionController, PurchaseError, PurchaseReceipt};
use bandstand_core::availability::Availability;
use bandstand_core::catalog::{
    Catalog, CatalogError, ConcertDraft, ConcertEdit, ConcertFilter, ConcertStore,
};
use bandstand_core::environment::{Clock, SystemClock};
use bandstand_core::ledger::TicketLedger;
use bandstand_core::status::ConcertStatus;
use bandstand_core::types::{Capacity, Concert, ConcertId, Money, UserId};
use bandstand_postgres::{PostgresConcertStore, PostgresTicketLedger, connect_pool, init_schema};
use bandstand_testing::{InMemoryConcertStore, InMemoryTicketLedger};
use std::sync::Arc;

/// The assembled portal.
///
/// Construction is explicit: [`Portal::connect_postgres`] performs the
/// one-time schema initialization before any request is served, and
/// [`Portal::in_memory`] wires the deterministic test stores.
#[derive(Clone)]
pub struct Portal {
    accounts: AccountRegistry,
    catalog: Catalog,
    admission: AdmissionController,
    overrides: AdminOverride,
    shortlist: Shortlist,
}

impl Portal {
    /// Assemble a portal from explicit store implementations.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConcertStore>,
        ledger: Arc<dyn TicketLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = Catalog::new(store.clone(), ledger.clone(), clock.clone());
        Self {
            accounts: AccountRegistry::new(clock.clone()),
            admission: AdmissionController::new(store.clone(), ledger.clone(), clock),
            overrides: AdminOverride::new(store, ledger),
            shortlist: Shortlist::new(catalog.clone()),
            catalog,
        }
    }

    /// A portal backed by the in-memory stores and the system clock.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryConcertStore::new()),
            Arc::new(InMemoryTicketLedger::new()),
            Arc::new(SystemClock),
        )
    }

    /// A portal backed by `PostgreSQL`. Connects the pool and runs the
    /// one-time schema initialization.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx` error if connecting or initializing
    /// the schema fails.
    pub async fn connect_postgres(database: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = connect_pool(&database.url, database.max_connections).await?;
        init_schema(&pool).await?;
        Ok(Self::new(
            Arc::new(PostgresConcertStore::new(pool.clone())),
            Arc::new(PostgresTicketLedger::new(pool)),
            Arc::new(SystemClock),
        ))
    }

    /// The account registry.
    #[must_use]
    pub const fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    /// The concert catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ========================================================================
    // Ticket sales
    // ========================================================================

    /// Purchase up to `quantity` tickets for a registered buyer.
    ///
    /// # Errors
    ///
    /// See [`PurchaseError`]; an unregistered buyer is an
    /// [`PurchaseError::InvalidRequest`].
    pub async fn purchase(
        &self,
        buyer: UserId,
        concert_id: ConcertId,
        quantity: u32,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        match self.accounts.get(buyer) {
            Ok(_) => {}
            Err(AccountError::NotFound(_)) => {
                return Err(PurchaseError::InvalidRequest(
                    "buyer is not a registered account".to_string(),
                ));
            }
            Err(error) => return Err(PurchaseError::Storage(error.to_string())),
        }
        self.admission.purchase(concert_id, buyer, quantity).await
    }

    /// Availability snapshot for a concert.
    ///
    /// # Errors
    ///
    /// See [`CatalogError`].
    pub async fn get_availability(&self, concert_id: ConcertId) -> Result<Availability, CatalogError> {
        self.catalog.availability(concert_id).await
    }

    // ========================================================================
    // Administrative overrides
    // ========================================================================

    /// Change capacity and request a status; returns the effective status
    /// after re-derivation against the ledger.
    ///
    /// # Errors
    ///
    /// See [`OverrideError`].
    pub async fn admin_set_capacity(
        &self,
        actor_id: UserId,
        concert_id: ConcertId,
        max_tickets: Capacity,
        requested_status: ConcertStatus,
    ) -> Result<ConcertStatus, OverrideError> {
        let actor = self.override_actor(actor_id)?;
        self.overrides
            .set_capacity(actor, concert_id, max_tickets, requested_status)
            .await
    }

    /// Cancel a concert.
    ///
    /// # Errors
    ///
    /// See [`OverrideError`].
    pub async fn admin_cancel(
        &self,
        actor_id: UserId,
        concert_id: ConcertId,
    ) -> Result<ConcertStatus, OverrideError> {
        let actor = self.override_actor(actor_id)?;
        self.overrides.cancel(actor, concert_id).await
    }

    /// Change a concert's ticket price.
    ///
    /// # Errors
    ///
    /// See [`OverrideError`].
    pub async fn admin_set_price(
        &self,
        actor_id: UserId,
        concert_id: ConcertId,
        ticket_price: Money,
    ) -> Result<(), OverrideError> {
        let actor = self.override_actor(actor_id)?;
        self.overrides.set_price(actor, concert_id, ticket_price).await
    }

    /// Reverse a cancellation.
    ///
    /// # Errors
    ///
    /// See [`OverrideError`].
    pub async fn admin_reinstate(
        &self,
        actor_id: UserId,
        concert_id: ConcertId,
    ) -> Result<ConcertStatus, OverrideError> {
        let actor = self.override_actor(actor_id)?;
        self.overrides.reinstate(actor, concert_id).await
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Create a concert owned by the acting band.
    ///
    /// # Errors
    ///
    /// See [`CatalogError`].
    pub async fn create_concert(
        &self,
        actor_id: UserId,
        draft: ConcertDraft,
    ) -> Result<Concert, CatalogError> {
        let actor = self.catalog_actor(actor_id)?;
        self.catalog.create(actor, draft).await
    }

    /// Edit a concert (owner or admin).
    ///
    /// # Errors
    ///
    /// See [`CatalogError`].
    pub async fn edit_concert(
        &self,
        actor_id: UserId,
        concert_id: ConcertId,
        edit: ConcertEdit,
    ) -> Result<Concert, CatalogError> {
        let actor = self.catalog_actor(actor_id)?;
        self.catalog.edit(actor, concert_id, edit).await
    }

    /// Search the catalog.
    ///
    /// # Errors
    ///
    /// See [`CatalogError`].
    pub async fn search(&self, filter: ConcertFilter) -> Result<Vec<Concert>, CatalogError> {
        self.catalog.search(filter).await
    }

    /// Concerts owned by a band, ordered by start time.
    ///
    /// # Errors
    ///
    /// See [`CatalogError`].
    pub async fn my_concerts(&self, owner: UserId) -> Result<Vec<Concert>, CatalogError> {
        self.catalog.list_owned(owner).await
    }

    // ========================================================================
    // Fan shortlist
    // ========================================================================

    /// Add a concert to a fan's shortlist.
    ///
    /// # Errors
    ///
    /// See [`ShortlistError`].
    pub async fn add_selected(
        &self,
        actor_id: UserId,
        concert_id: ConcertId,
    ) -> Result<(), ShortlistError> {
        let actor = self.shortlist_actor(actor_id)?;
        self.shortlist.add(actor, concert_id).await
    }

    /// Remove a concert from a fan's shortlist.
    ///
    /// # Errors
    ///
    /// See [`ShortlistError`].
    pub fn remove_selected(
        &self,
        actor_id: UserId,
        concert_id: ConcertId,
    ) -> Result<(), ShortlistError> {
        let actor = self.shortlist_actor(actor_id)?;
        self.shortlist.remove(actor, concert_id)
    }

    /// A fan's selected concerts, ordered by start time.
    ///
    /// # Errors
    ///
    /// See [`ShortlistError`].
    pub async fn selected_concerts(&self, actor_id: UserId) -> Result<Vec<Concert>, ShortlistError> {
        let actor = self.shortlist_actor(actor_id)?;
        self.shortlist.list(actor).await
    }

    // ========================================================================
    // Actor resolution
    // ========================================================================

    fn override_actor(
        &self,
        actor_id: UserId,
    ) -> Result<bandstand_core::types::Actor, OverrideError> {
        match self.accounts.get(actor_id) {
            Ok(account) => Ok(account.actor()),
            Err(AccountError::NotFound(_)) => Err(OverrideError::Forbidden(
                "unknown account".to_string(),
            )),
            Err(error) => Err(OverrideError::Storage(error.to_string())),
        }
    }

    fn catalog_actor(
        &self,
        actor_id: UserId,
    ) -> Result<bandstand_core::types::Actor, CatalogError> {
        match self.accounts.get(actor_id) {
            Ok(account) => Ok(account.actor()),
            Err(AccountError::NotFound(_)) => {
                Err(CatalogError::Forbidden("unknown account".to_string()))
            }
            Err(error) => Err(CatalogError::Storage(error.to_string())),
        }
    }

    fn shortlist_actor(
        &self,
        actor_id: UserId,
    ) -> Result<bandstand_core::types::Actor, ShortlistError> {
        match self.accounts.get(actor_id) {
            Ok(account) => Ok(account.actor()),
            Err(AccountError::NotFound(_)) => Err(ShortlistError::Forbidden),
            Err(error) => Err(ShortlistError::Storage(error.to_string())),
        }
    }
}
