//! Capacity resolution: how many tickets a concert has left.
//!
//! Pure read-side computations over the ledger and the concert record.
//! `remaining` is signed and may be zero or negative — an administrator may
//! lower capacity below the sold total — so callers must never assume
//! positivity.

use crate::status::{self, ConcertStatus};
use crate::types::{Concert, TicketSale};
use serde::{Deserialize, Serialize};

/// Availability snapshot for a concert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Configured capacity
    pub max_tickets: u32,
    /// Total tickets sold across all ledger entries
    pub sold: u64,
    /// `max_tickets - sold`; zero or negative when sold out
    pub remaining: i64,
    /// Effective status: re-derived from the sold total, except `Cancelled`
    /// which is authoritative
    pub status: ConcertStatus,
}

impl Availability {
    /// Compute the availability snapshot for a concert given its sold total.
    #[must_use]
    pub fn compute(concert: &Concert, sold: u64) -> Self {
        let status = if concert.status == ConcertStatus::Cancelled {
            ConcertStatus::Cancelled
        } else {
            status::derive(sold, concert.max_tickets.value())
        };

        Self {
            max_tickets: concert.max_tickets.value(),
            sold,
            remaining: remaining(concert.max_tickets.value(), sold),
            status,
        }
    }

    /// Whether any tickets can still be admitted.
    #[must_use]
    pub const fn has_capacity(&self) -> bool {
        self.remaining > 0
    }
}

/// Sum the quantities of a concert's ledger entries.
///
/// The ledger is append-only and entries are immutable, so this is a pure,
/// replayable function of the entry list.
#[must_use]
pub fn tally(sales: &[TicketSale]) -> u64 {
    sales.iter().map(|sale| u64::from(sale.quantity)).sum()
}

/// `max_tickets - sold` as a signed count.
#[must_use]
pub fn remaining(max_tickets: u32, sold: u64) -> i64 {
    let sold = i64::try_from(sold).unwrap_or(i64::MAX);
    i64::from(max_tickets).saturating_sub(sold)
}
