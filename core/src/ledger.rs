//! The ticket sales ledger: append-only source of truth for quantity sold.
//!
//! # Design
//!
//! The ledger stores one immutable [`TicketSale`] entry per admitted
//! purchase. It deliberately exposes only what admission control needs:
//!
//! - Append an entry with optimistic concurrency
//! - Load a concert's entries for availability resolution
//!
//! Each concert has its own entry sequence, numbered by [`LedgerVersion`].
//! A writer observes the version while resolving availability and asserts it
//! on append; when another purchase landed in between, the append fails with
//! [`LedgerError::Conflict`] and the caller restarts the whole
//! validate-clamp-append sequence. This is what makes two racing buyers
//! unable to both take the last tickets.
//!
//! # Implementations
//!
//! - `PostgresTicketLedger` (in `bandstand-postgres`): production
//! - `InMemoryTicketLedger` (in `bandstand-testing`): fast, deterministic tests

use crate::types::{ConcertId, TicketSale};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Position of a concert's ledger after some number of appends.
///
/// A concert with no sales is at [`LedgerVersion::INITIAL`]; each appended
/// entry advances the version by one. The version doubles as the optimistic
/// concurrency token for [`TicketLedger::append_sale`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerVersion(u64);

impl LedgerVersion {
    /// The version of an empty ledger (no sales yet).
    pub const INITIAL: Self = Self(0);

    /// Create a `LedgerVersion` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LedgerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LedgerVersion {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Errors that can occur during ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Optimistic concurrency conflict: another purchase was appended since
    /// the expected version was observed. The only retryable error kind —
    /// callers restart the whole validate-clamp-append sequence.
    #[error("Ledger conflict on concert {concert_id}: expected version {expected}, found {actual}")]
    Conflict {
        /// Concert whose ledger was contended
        concert_id: ConcertId,
        /// The version the writer observed at resolve time
        expected: LedgerVersion,
        /// The version actually found at append time
        actual: LedgerVersion,
    },

    /// Storage backend failure (connection, query, serialization).
    #[error("Ledger storage error: {0}")]
    Storage(String),
}

/// Append-only store for ticket sales with per-concert optimistic concurrency.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the admission controller shares
/// one ledger across concurrent purchase requests.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
/// the trait can be used as `Arc<dyn TicketLedger>`.
pub trait TicketLedger: Send + Sync {
    /// Append a sale to a concert's ledger.
    ///
    /// `expected_version` is the version observed when availability was
    /// resolved. The append succeeds only if the ledger is still at that
    /// version; the entry is then recorded at `expected_version.next()`,
    /// which is also the returned value.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Conflict`]: another entry landed first; retry the
    ///   whole sequence
    /// - [`LedgerError::Storage`]: backend failure
    fn append_sale(
        &self,
        concert_id: ConcertId,
        expected_version: LedgerVersion,
        sale: TicketSale,
    ) -> Pin<Box<dyn Future<Output = Result<LedgerVersion, LedgerError>> + Send + '_>>;

    /// Load a concert's sales, oldest first, along with the current version.
    ///
    /// A concert with no sales yields `(LedgerVersion::INITIAL, vec![])` —
    /// an empty ledger is not an error.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Storage`]: backend failure
    fn load_sales(
        &self,
        concert_id: ConcertId,
    ) -> Pin<Box<dyn Future<Output = Result<(LedgerVersion, Vec<TicketSale>), LedgerError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_advances_by_one() {
        let v0 = LedgerVersion::INITIAL;
        assert_eq!(v0.value(), 0);
        assert_eq!(v0.next(), LedgerVersion::new(1));
        assert_eq!(v0.next().next(), LedgerVersion::new(2));
    }

    #[test]
    fn conflict_error_display() {
        let error = LedgerError::Conflict {
            concert_id: ConcertId::new(),
            expected: LedgerVersion::new(5),
            actual: LedgerVersion::new(7),
        };

        let display = format!("{error}");
        assert!(display.contains("expected version 5"));
        assert!(display.contains("found 7"));
    }
}
