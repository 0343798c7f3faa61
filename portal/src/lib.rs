//! # Bandstand Portal
//!
//! Application layer for the Bandstand concert portal: account registry,
//! concert catalog access, ticket purchasing, administrative overrides, and
//! the fan shortlist, assembled behind a single [`Portal`] facade.
//!
//! The interesting machinery — the admission protocol, the sales ledger,
//! the status derivation — lives in `bandstand-core`; this crate wires it
//! to storage backends and carries the portal-only concerns (accounts,
//! shortlist, configuration).
//!
//! ## Example
//!
//! ```
//! use bandstand_portal::Portal;
//! use bandstand_core::types::Role;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let portal = Portal::in_memory();
//! let fan = portal.accounts().register("fan01", Role::Fan);
//! assert!(fan.is_ok());
//! # }
//! ```

/// Account registry
pub mod accounts;
/// Environment-driven configuration
pub mod config;
/// The portal facade
pub mod portal;
/// The fan shortlist ("Selected Concerts")
pub mod selected;

pub use accounts::{Account, AccountError, AccountRegistry};
pub use config::{Config, DatabaseConfig, LogConfig};
pub use portal::Portal;
pub use selected::{Shortlist, ShortlistError};
