//! Concurrent directory of per-user ledgers.
//!
//! [`LedgerRegistry`] maps user identifiers to their [`Ledger`]. Ledgers are
//! created lazily on first reference and live for the whole process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::Ledger;

/// Central store for all user ledgers.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and hands out
/// `Arc<Ledger>` so each ledger is locked independently of the map.
///
/// # Concurrency
///
/// - Lookups of existing users only take the read lock.
/// - Concurrent first accesses for the same user produce exactly one ledger.
/// - Operations on different users never contend on a ledger lock.
#[derive(Debug, Default)]
pub struct LedgerRegistry {
    ledgers: RwLock<HashMap<String, Arc<Ledger>>>,
}

impl LedgerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ledger of `user`, creating it if this is the first access.
    pub async fn get_or_create(&self, user: &str) -> Arc<Ledger> {
        if let Some(ledger) = self.ledgers.read().await.get(user) {
            return Arc::clone(ledger);
        }

        let mut map = self.ledgers.write().await;
        let ledger = map.entry(user.to_string()).or_insert_with(|| {
            tracing::debug!(user, "creating ledger");
            Arc::new(Ledger::new(user))
        });
        Arc::clone(ledger)
    }

    /// Returns the ledger of `user` if it has been referenced before.
    pub async fn get(&self, user: &str) -> Option<Arc<Ledger>> {
        self.ledgers.read().await.get(user).map(Arc::clone)
    }

    /// Returns every known user identifier in ascending order.
    pub async fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.ledgers.read().await.keys().cloned().collect();
        users.sort();
        users
    }

    /// Drops every ledger.
    pub async fn clear(&self) {
        self.ledgers.write().await.clear();
    }

    /// Returns the number of ledgers in the registry.
    pub async fn len(&self) -> usize {
        self.ledgers.read().await.len()
    }

    /// Returns `true` if no ledger has been created yet.
    pub async fn is_empty(&self) -> bool {
        self.ledgers.read().await.is_empty()
    }
}
