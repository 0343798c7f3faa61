//! The fan shortlist: "Selected Concerts".
//!
//! Fans keep a personal list of concerts they are watching. Adding is
//! idempotent — selecting a concert twice is not an error — and listing
//! returns the concerts ordered by start time.

use bandstand_core::catalog::{Catalog, CatalogError};
use bandstand_core::types::{Actor, Concert, ConcertId, Role};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors surfaced by shortlist operations.
#[derive(Error, Debug)]
pub enum ShortlistError {
    /// Only fan accounts keep shortlists.
    #[error("Fan access required")]
    Forbidden,

    /// The concert does not exist.
    #[error("Concert not found: {0}")]
    NotFound(ConcertId),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<CatalogError> for ShortlistError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Per-fan shortlist of concerts.
#[derive(Clone)]
pub struct Shortlist {
    selections: Arc<RwLock<HashMap<bandstand_core::types::UserId, HashSet<ConcertId>>>>,
    catalog: Catalog,
}

impl Shortlist {
    /// Creates an empty shortlist service
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            selections: Arc::new(RwLock::new(HashMap::new())),
            catalog,
        }
    }

    /// Add a concert to the fan's shortlist. Idempotent.
    ///
    /// # Errors
    ///
    /// - [`ShortlistError::Forbidden`]: the actor is not a fan
    /// - [`ShortlistError::NotFound`]: the concert does not exist
    /// - [`ShortlistError::Storage`]: backend failure
    pub async fn add(&self, actor: Actor, concert_id: ConcertId) -> Result<(), ShortlistError> {
        if actor.role != Role::Fan {
            return Err(ShortlistError::Forbidden);
        }

        // Selecting a missing concert is an error; selecting twice is not
        self.catalog.get(concert_id).await?;

        let mut selections = self
            .selections
            .write()
            .map_err(|_| ShortlistError::Storage("shortlist lock poisoned".to_string()))?;
        selections.entry(actor.id).or_default().insert(concert_id);
        Ok(())
    }

    /// Remove a concert from the fan's shortlist. Removing an unselected
    /// concert is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ShortlistError::Forbidden`]: the actor is not a fan
    /// - [`ShortlistError::Storage`]: backend failure
    pub fn remove(&self, actor: Actor, concert_id: ConcertId) -> Result<(), ShortlistError> {
        if actor.role != Role::Fan {
            return Err(ShortlistError::Forbidden);
        }

        let mut selections = self
            .selections
            .write()
            .map_err(|_| ShortlistError::Storage("shortlist lock poisoned".to_string()))?;
        if let Some(selected) = selections.get_mut(&actor.id) {
            selected.remove(&concert_id);
        }
        Ok(())
    }

    /// The fan's selected concerts, ordered by start time.
    ///
    /// # Errors
    ///
    /// - [`ShortlistError::Forbidden`]: the actor is not a fan
    /// - [`ShortlistError::Storage`]: backend failure
    pub async fn list(&self, actor: Actor) -> Result<Vec<Concert>, ShortlistError> {
        if actor.role != Role::Fan {
            return Err(ShortlistError::Forbidden);
        }

        let selected = {
            let selections = self
                .selections
                .read()
                .map_err(|_| ShortlistError::Storage("shortlist lock poisoned".to_string()))?;
            selections.get(&actor.id).cloned().unwrap_or_default()
        };

        let mut concerts = Vec::with_capacity(selected.len());
        for concert_id in selected {
            match self.catalog.get(concert_id).await {
                Ok(concert) => concerts.push(concert),
                // A concert deleted since selection just drops off the list
                Err(CatalogError::NotFound(_)) => {}
                Err(other) => return Err(other.into()),
            }
        }
        concerts.sort_by_key(|concert| concert.starts_at);
        Ok(concerts)
    }
}
