//! Account registry: who can act, and as what.
//!
//! Bandstand's core takes authenticated identities as given; this registry
//! is the minimal account layer the portal needs to hand the core an
//! [`Actor`]. Passwords and sessions live outside the portal.

use bandstand_core::environment::Clock;
use bandstand_core::types::{Actor, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// A registered portal account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier
    pub id: UserId,
    /// Unique username
    pub username: String,
    /// Account role
    pub role: Role,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The actor identity for this account.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// Errors surfaced by the account registry.
#[derive(Error, Debug)]
pub enum AccountError {
    /// The username is already registered.
    #[error("User already exists: {0}")]
    UsernameTaken(String),

    /// The username failed validation.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// No account with the given id exists.
    #[error("Account not found: {0}")]
    NotFound(UserId),

    /// Registry lock failure.
    #[error("Account registry error: {0}")]
    Storage(String),
}

/// In-process account registry.
#[derive(Clone)]
pub struct AccountRegistry {
    accounts: Arc<RwLock<HashMap<UserId, Account>>>,
    clock: Arc<dyn Clock>,
}

impl AccountRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Register a new account with a unique username.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InvalidUsername`]: empty username
    /// - [`AccountError::UsernameTaken`]: duplicate username
    /// - [`AccountError::Storage`]: registry lock failure
    pub fn register(&self, username: &str, role: Role) -> Result<Account, AccountError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AccountError::InvalidUsername(
                "username cannot be empty".to_string(),
            ));
        }

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AccountError::Storage("registry lock poisoned".to_string()))?;

        if accounts
            .values()
            .any(|account| account.username == username)
        {
            return Err(AccountError::UsernameTaken(username.to_string()));
        }

        let account = Account {
            id: UserId::new(),
            username: username.to_string(),
            role,
            created_at: self.clock.now(),
        };
        accounts.insert(account.id, account.clone());
        tracing::info!(user_id = %account.id, username, role = ?role, "Account registered");
        Ok(account)
    }

    /// Fetch an account by id.
    ///
    /// # Errors
    ///
    /// - [`AccountError::NotFound`]: unknown account
    /// - [`AccountError::Storage`]: registry lock failure
    pub fn get(&self, id: UserId) -> Result<Account, AccountError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AccountError::Storage("registry lock poisoned".to_string()))?;
        accounts.get(&id).cloned().ok_or(AccountError::NotFound(id))
    }

    /// Fetch an account by username.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Storage`] on registry lock failure.
    pub fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AccountError::Storage("registry lock poisoned".to_string()))?;
        Ok(accounts
            .values()
            .find(|account| account.username == username)
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bandstand_core::environment::SystemClock;

    fn registry() -> AccountRegistry {
        AccountRegistry::new(Arc::new(SystemClock))
    }

    #[test]
    fn register_and_fetch() {
        let registry = registry();
        let account = registry.register("thebbs", Role::Band).unwrap();
        assert_eq!(registry.get(account.id).unwrap(), account);
        assert_eq!(
            registry.find_by_username("thebbs").unwrap().unwrap().id,
            account.id
        );
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let registry = registry();
        registry.register("fan01", Role::Fan).unwrap();
        assert!(matches!(
            registry.register("fan01", Role::Fan),
            Err(AccountError::UsernameTaken(_))
        ));
    }

    #[test]
    fn empty_usernames_are_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.register("   ", Role::Fan),
            Err(AccountError::InvalidUsername(_))
        ));
    }
}
