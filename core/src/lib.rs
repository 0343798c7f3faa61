//! # Bandstand Core
//!
//! Ticket inventory and admission control for the Bandstand concert portal.
//!
//! The portal around this crate is routing and rendering; the engineering
//! problem lives here: selling a bounded number of tickets per concert to
//! many concurrent buyers without overselling, while supporting partial
//! fulfillment, derived availability status, and administrative overrides
//! that stay consistent with the sales ledger.
//!
//! ## Core Concepts
//!
//! - **Ledger** ([`ledger`]): append-only record of ticket sales, the
//!   source of truth for quantity sold, with per-concert optimistic
//!   concurrency
//! - **Capacity resolution** ([`availability`]): pure computation of
//!   sold/remaining from the ledger
//! - **Admission control** ([`admission`]): the purchase protocol —
//!   validate, clamp to remaining capacity, append, flip status
//! - **Status state machine** ([`status`]): `scheduled`/`full`/`cancelled`
//!   with a single re-derivation rule shared by every write path
//! - **Admin override** ([`admin`]): capacity/price/cancellation edits that
//!   re-synchronize status against the ledger
//! - **Catalog** ([`catalog`]): concert records, ownership, and search
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: the admission decision is a pure
//!   function; I/O happens at the edges
//! - The stored status is a cache of a pure function over
//!   `(sold, max_tickets)` plus an authoritative `cancelled` override
//! - Dependency injection via traits ([`catalog::ConcertStore`],
//!   [`ledger::TicketLedger`], [`environment::Clock`])
//!
//! ## Example
//!
//! ```ignore
//! use bandstand_core::admission::AdmissionController;
//!
//! let admission = AdmissionController::new(store, ledger, clock);
//! let receipt = admission.purchase(concert_id, buyer_id, 2).await?;
//! assert!(receipt.admitted <= 2);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Administrative overrides: capacity, price, cancellation
pub mod admin;
/// The purchase protocol
pub mod admission;
/// Capacity resolution
pub mod availability;
/// Concert records, ownership, and search
pub mod catalog;
/// Injected dependencies (clock)
pub mod environment;
/// The append-only ticket sales ledger
pub mod ledger;
/// Conflict retry backoff policy
pub mod retry;
/// Concert status and its derivation rules
pub mod status;
/// Domain types
pub mod types;

pub use admin::AdminOverride;
pub use admission::{AdmissionController, Fulfillment, PurchaseError, PurchaseReceipt};
pub use availability::Availability;
pub use catalog::{Catalog, ConcertDraft, ConcertEdit, ConcertFilter, ConcertStore};
pub use ledger::{LedgerError, LedgerVersion, TicketLedger};
pub use status::ConcertStatus;
pub use types::{Actor, Capacity, Concert, ConcertId, Money, Role, TicketSale, UserId};
