//! # Bandstand Testing
//!
//! Testing utilities and in-memory store implementations for Bandstand.
//!
//! This crate provides:
//! - In-memory implementations of the ledger and concert store traits with
//!   the same concurrency semantics as the production backends
//! - A fixed clock for deterministic time
//! - Fixture builders for common test data
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use bandstand_testing::mocks;
//! use bandstand_core::AdmissionController;
//!
//! # async fn example() {
//! let store = Arc::new(mocks::InMemoryConcertStore::new());
//! let ledger = Arc::new(mocks::InMemoryTicketLedger::new());
//! let clock = Arc::new(mocks::test_clock());
//!
//! let admission = AdmissionController::new(store, ledger, clock);
//! # let _ = admission;
//! # }
//! ```

/// Mock implementations of the core's injected dependencies.
pub mod mocks {
    use bandstand_core::catalog::{ConcertStore, ConcertStoreError};
    use bandstand_core::environment::Clock;
    use bandstand_core::ledger::{LedgerError, LedgerVersion, TicketLedger};
    use bandstand_core::types::{Concert, ConcertId, TicketSale};
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Mutex, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bandstand_testing::mocks::FixedClock;
    /// use bandstand_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now()); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// In-memory ticket ledger with real optimistic-concurrency semantics.
    ///
    /// The version check and the append happen under one lock, so two
    /// writers racing on the same observed version see exactly what the
    /// production backend would give them: one wins, one gets
    /// [`LedgerError::Conflict`].
    #[derive(Debug, Default)]
    pub struct InMemoryTicketLedger {
        sales: Mutex<HashMap<ConcertId, Vec<TicketSale>>>,
    }

    impl InMemoryTicketLedger {
        /// Creates an empty ledger
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl TicketLedger for InMemoryTicketLedger {
        fn append_sale(
            &self,
            concert_id: ConcertId,
            expected_version: LedgerVersion,
            sale: TicketSale,
        ) -> Pin<Box<dyn Future<Output = Result<LedgerVersion, LedgerError>> + Send + '_>> {
            Box::pin(async move {
                let mut sales = self
                    .sales
                    .lock()
                    .map_err(|_| LedgerError::Storage("ledger lock poisoned".to_string()))?;
                let entries = sales.entry(concert_id).or_default();
                let actual = LedgerVersion::new(entries.len() as u64);

                if actual != expected_version {
                    return Err(LedgerError::Conflict {
                        concert_id,
                        expected: expected_version,
                        actual,
                    });
                }

                entries.push(sale);
                Ok(actual.next())
            })
        }

        fn load_sales(
            &self,
            concert_id: ConcertId,
        ) -> Pin<
            Box<
                dyn Future<Output = Result<(LedgerVersion, Vec<TicketSale>), LedgerError>>
                    + Send
                    + '_,
            >,
        > {
            Box::pin(async move {
                let sales = self
                    .sales
                    .lock()
                    .map_err(|_| LedgerError::Storage("ledger lock poisoned".to_string()))?;
                let entries = sales.get(&concert_id).cloned().unwrap_or_default();
                Ok((LedgerVersion::new(entries.len() as u64), entries))
            })
        }
    }

    /// In-memory concert record store.
    #[derive(Debug, Default)]
    pub struct InMemoryConcertStore {
        concerts: RwLock<HashMap<ConcertId, Concert>>,
    }

    impl InMemoryConcertStore {
        /// Creates an empty store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl ConcertStore for InMemoryConcertStore {
        fn insert(
            &self,
            concert: Concert,
        ) -> Pin<Box<dyn Future<Output = Result<(), ConcertStoreError>> + Send + '_>> {
            Box::pin(async move {
                let mut concerts = self
                    .concerts
                    .write()
                    .map_err(|_| ConcertStoreError::Storage("store lock poisoned".to_string()))?;
                concerts.insert(concert.id, concert);
                Ok(())
            })
        }

        fn get(
            &self,
            id: ConcertId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Concert>, ConcertStoreError>> + Send + '_>>
        {
            Box::pin(async move {
                let concerts = self
                    .concerts
                    .read()
                    .map_err(|_| ConcertStoreError::Storage("store lock poisoned".to_string()))?;
                Ok(concerts.get(&id).cloned())
            })
        }

        fn update(
            &self,
            concert: Concert,
        ) -> Pin<Box<dyn Future<Output = Result<(), ConcertStoreError>> + Send + '_>> {
            Box::pin(async move {
                let mut concerts = self
                    .concerts
                    .write()
                    .map_err(|_| ConcertStoreError::Storage("store lock poisoned".to_string()))?;
                if !concerts.contains_key(&concert.id) {
                    return Err(ConcertStoreError::NotFound(concert.id));
                }
                concerts.insert(concert.id, concert);
                Ok(())
            })
        }

        fn list(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Concert>, ConcertStoreError>> + Send + '_>>
        {
            Box::pin(async move {
                let concerts = self
                    .concerts
                    .read()
                    .map_err(|_| ConcertStoreError::Storage("store lock poisoned".to_string()))?;
                Ok(concerts.values().cloned().collect())
            })
        }
    }
}

/// Fixture builders for common test data.
pub mod fixtures {
    use bandstand_core::types::{Capacity, Concert, ConcertId, Money, UserId};
    use chrono::{Duration, Utc};

    /// A scheduled concert with the given owner and capacity, starting in a
    /// week, priced at $20.00.
    #[must_use]
    pub fn concert(owner: UserId, capacity: u32) -> Concert {
        Concert::new(
            ConcertId::new(),
            "The Borrow Checkers".to_string(),
            "Main Hall".to_string(),
            Utc::now() + Duration::days(7),
            Money::from_cents(2000),
            Capacity::new(capacity),
            owner,
            Utc::now(),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryConcertStore, InMemoryTicketLedger, test_clock};
