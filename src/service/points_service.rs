//! Points service: routes per-user operations to their ledger.

use std::sync::Arc;

use crate::domain::{LedgerRegistry, PointEvent};
use crate::error::PointsError;

/// Orchestration layer for all point operations.
///
/// Stateless coordinator over the [`LedgerRegistry`]. Every method follows
/// the pattern: get-or-create the user's ledger → run the ledger operation
/// → return the result. Ledger locking happens inside [`crate::domain::Ledger`].
#[derive(Debug, Clone)]
pub struct PointsService {
    registry: Arc<LedgerRegistry>,
}

impl PointsService {
    /// Creates a new `PointsService`.
    #[must_use]
    pub fn new(registry: Arc<LedgerRegistry>) -> Self {
        Self { registry }
    }

    /// Returns a reference to the inner [`LedgerRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<LedgerRegistry> {
        &self.registry
    }

    /// Adds (or, for negative points, deducts from one payer) points for `user`.
    ///
    /// # Errors
    ///
    /// Returns a [`PointsError`] if the ledger rejects the event.
    pub async fn add_points(&self, user: &str, event: PointEvent) -> Result<(), PointsError> {
        let ledger = self.registry.get_or_create(user).await;
        ledger.add_points(event)?;
        Ok(())
    }

    /// Spends `amount` points of `user`, oldest first across all payers.
    ///
    /// # Errors
    ///
    /// Returns a [`PointsError`] if the user holds fewer than `amount`
    /// points or `amount` is not positive.
    pub async fn deduct_points(
        &self,
        user: &str,
        amount: i64,
    ) -> Result<Vec<PointEvent>, PointsError> {
        let ledger = self.registry.get_or_create(user).await;
        let removed = ledger.deduct_points(amount)?;
        Ok(removed)
    }

    /// Returns the per-payer totals of `user`, oldest payer first.
    pub async fn balances(&self, user: &str) -> Vec<PointEvent> {
        self.registry.get_or_create(user).await.balances()
    }

    /// Returns every user seen so far.
    pub async fn users(&self) -> Vec<String> {
        self.registry.users().await
    }
}
