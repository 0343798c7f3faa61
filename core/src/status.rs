//! Concert availability status and its derivation rules.
//!
//! The stored status is a cache of a pure function over `(sold, max_tickets)`
//! plus an independent `Cancelled` override. Every write path re-derives the
//! status through [`resolve_requested`] instead of trusting a caller-supplied
//! value; only the derivation itself may hold a concert at `Full`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for parsing a stored status string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid concert status: {0}")]
pub struct ParseStatusError(String);

/// Advertised availability of a concert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcertStatus {
    /// Accepting purchases while capacity remains
    Scheduled,
    /// Capacity exhausted; purchases are rejected until capacity is raised
    Full,
    /// Administratively suppressed; purchases are rejected regardless of capacity
    Cancelled,
}

impl ConcertStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Full => "full",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a status from its database string representation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseStatusError`] if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, ParseStatusError> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "full" => Ok(Self::Full),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

impl fmt::Display for ConcertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the capacity-driven status from the sold total and the capacity.
///
/// `Full` iff `sold >= max_tickets`; an admin may lower capacity below the
/// sold total, which also reads as `Full`.
#[must_use]
pub const fn derive(sold: u64, max_tickets: u32) -> ConcertStatus {
    if sold >= max_tickets as u64 {
        ConcertStatus::Full
    } else {
        ConcertStatus::Scheduled
    }
}

/// Resolve a requested status value against the current sales total.
///
/// This is the single re-derivation rule shared by the admission controller,
/// the admin override, and catalog edits:
///
/// - a requested `Cancelled` always wins, independent of capacity;
/// - otherwise the effective status is [`derive`]`(sold, max_tickets)` — a
///   requested `Scheduled` is forced to `Full` while the concert is sold
///   out, and a requested `Full` is honored only while it actually is.
#[must_use]
pub const fn resolve_requested(
    requested: ConcertStatus,
    sold: u64,
    max_tickets: u32,
) -> ConcertStatus {
    match requested {
        ConcertStatus::Cancelled => ConcertStatus::Cancelled,
        ConcertStatus::Scheduled | ConcertStatus::Full => derive(sold, max_tickets),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        for status in [
            ConcertStatus::Scheduled,
            ConcertStatus::Full,
            ConcertStatus::Cancelled,
        ] {
            assert_eq!(ConcertStatus::parse(status.as_str()), Ok(status));
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(ConcertStatus::parse("archived").is_err());
    }

    #[test]
    fn derive_full_at_capacity() {
        assert_eq!(derive(0, 10), ConcertStatus::Scheduled);
        assert_eq!(derive(9, 10), ConcertStatus::Scheduled);
        assert_eq!(derive(10, 10), ConcertStatus::Full);
        // Capacity lowered below the sold total still reads as full
        assert_eq!(derive(12, 10), ConcertStatus::Full);
    }

    #[test]
    fn requested_scheduled_downgraded_while_sold_out() {
        assert_eq!(
            resolve_requested(ConcertStatus::Scheduled, 10, 10),
            ConcertStatus::Full
        );
        assert_eq!(
            resolve_requested(ConcertStatus::Scheduled, 3, 10),
            ConcertStatus::Scheduled
        );
    }

    #[test]
    fn requested_full_honored_only_when_sold_out() {
        assert_eq!(
            resolve_requested(ConcertStatus::Full, 10, 10),
            ConcertStatus::Full
        );
        // Nothing may pin a concert at full while tickets remain
        assert_eq!(
            resolve_requested(ConcertStatus::Full, 3, 10),
            ConcertStatus::Scheduled
        );
    }

    #[test]
    fn cancelled_always_wins() {
        assert_eq!(
            resolve_requested(ConcertStatus::Cancelled, 0, 10),
            ConcertStatus::Cancelled
        );
        assert_eq!(
            resolve_requested(ConcertStatus::Cancelled, 10, 10),
            ConcertStatus::Cancelled
        );
    }
}
