//! Domain types for the Bandstand concert portal.
//!
//! Value objects and entities shared by the ticket ledger, the admission
//! controller, and the concert catalog. Identifiers are UUID newtypes,
//! money is cents-based to avoid floating-point arithmetic errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::status::ConcertStatus;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a concert
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConcertId(Uuid);

impl ConcertId {
    /// Creates a new random `ConcertId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ConcertId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConcertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConcertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user account (band, fan, or admin)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents a ticket price in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies the price by a ticket quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Capacity
// ============================================================================

/// Maximum number of tickets a concert may sell
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// The default capacity applied when a concert is created without one
    pub const DEFAULT: Self = Self(100);

    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Actors
// ============================================================================

/// Role attached to a user account
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Band account: creates and manages its own concerts
    Band,
    /// Fan account: buys tickets and keeps a shortlist
    Fan,
    /// Administrator: may override any concert
    Admin,
}

/// The identity performing a catalog or override operation.
///
/// Authentication lives outside this crate; callers pass the already
/// authenticated identity and role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Account identifier
    pub id: UserId,
    /// Account role
    pub role: Role,
}

impl Actor {
    /// Creates a new `Actor`
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether this actor may administer the given concert
    #[must_use]
    pub fn may_manage(&self, concert: &Concert) -> bool {
        self.role == Role::Admin || concert.owner == self.id
    }
}

// ============================================================================
// Domain Entities
// ============================================================================

/// Concert entity: a listed performance with a bounded ticket inventory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concert {
    /// Unique concert identifier
    pub id: ConcertId,
    /// Performing band name
    pub band_name: String,
    /// Venue name
    pub venue: String,
    /// Scheduled date and time
    pub starts_at: DateTime<Utc>,
    /// Price per ticket
    pub ticket_price: Money,
    /// Maximum number of tickets that may be sold
    pub max_tickets: Capacity,
    /// Advertised availability status (cached; re-derived on every write path)
    pub status: ConcertStatus,
    /// Band account that owns this concert
    pub owner: UserId,
    /// When the concert was created
    pub created_at: DateTime<Utc>,
}

impl Concert {
    /// Creates a new scheduled `Concert`
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        id: ConcertId,
        band_name: String,
        venue: String,
        starts_at: DateTime<Utc>,
        ticket_price: Money,
        max_tickets: Capacity,
        owner: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            band_name,
            venue,
            starts_at,
            ticket_price,
            max_tickets,
            status: ConcertStatus::Scheduled,
            owner,
            created_at,
        }
    }
}

/// A single ticket purchase as recorded in the ledger.
///
/// Entries are immutable once written and never deleted by the admission
/// path, so `sold(concert)` is always the plain sum of `quantity` over the
/// concert's entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSale {
    /// Concert the tickets belong to
    pub concert_id: ConcertId,
    /// Buyer account
    pub buyer_id: UserId,
    /// Number of tickets admitted (always positive)
    pub quantity: u32,
    /// When the purchase was admitted
    pub purchased_at: DateTime<Utc>,
}

impl TicketSale {
    /// Creates a new `TicketSale`
    #[must_use]
    pub const fn new(
        concert_id: ConcertId,
        buyer_id: UserId,
        quantity: u32,
        purchased_at: DateTime<Utc>,
    ) -> Self {
        Self {
            concert_id,
            buyer_id,
            quantity,
            purchased_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn money_display() {
        assert_eq!(format!("{}", Money::from_cents(2550)), "$25.50");
        assert_eq!(format!("{}", Money::from_cents(5)), "$0.05");
    }

    #[test]
    fn money_from_dollars() {
        let price = Money::checked_from_dollars(25).unwrap();
        assert_eq!(price.cents(), 2500);
        assert!(Money::checked_from_dollars(u64::MAX).is_none());
    }

    #[test]
    fn money_multiply() {
        let price = Money::from_cents(1500);
        assert_eq!(price.checked_multiply(4).unwrap().cents(), 6000);
        assert!(Money::from_cents(u64::MAX).checked_multiply(2).is_none());
    }

    #[test]
    fn capacity_default_is_one_hundred() {
        assert_eq!(Capacity::default().value(), 100);
    }

    #[test]
    fn concert_ids_are_unique() {
        assert_ne!(ConcertId::new(), ConcertId::new());
    }

    #[test]
    fn admin_may_manage_any_concert() {
        let owner = UserId::new();
        let concert = Concert::new(
            ConcertId::new(),
            "The Borrow Checkers".to_string(),
            "Main Hall".to_string(),
            Utc::now(),
            Money::from_cents(2000),
            Capacity::new(50),
            owner,
            Utc::now(),
        );

        let admin = Actor::new(UserId::new(), Role::Admin);
        let stranger = Actor::new(UserId::new(), Role::Band);
        let owning_band = Actor::new(owner, Role::Band);

        assert!(admin.may_manage(&concert));
        assert!(owning_band.may_manage(&concert));
        assert!(!stranger.may_manage(&concert));
    }
}
