//! Immutable record of a single point grant or adjustment.

use std::cmp::Ordering;

use super::{LedgerError, OrderKey};

/// Points contributed (or corrected) by one payer at one instant.
///
/// Events are never mutated. Deductions and merges always construct a new
/// event via [`PointEvent::with_points`] or [`PointEvent::merge`].
///
/// Ordering and equality for ordering purposes are structural over the
/// [`OrderKey`] only.
#[derive(Debug, Clone)]
pub struct PointEvent {
    payer: String,
    points: i64,
    order_key: OrderKey,
}

impl PointEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(payer: impl Into<String>, points: i64, order_key: OrderKey) -> Self {
        Self {
            payer: payer.into(),
            points,
            order_key,
        }
    }

    /// Payer that contributed the points.
    #[must_use]
    pub fn payer(&self) -> &str {
        &self.payer
    }

    /// Signed point value.
    #[must_use]
    pub const fn points(&self) -> i64 {
        self.points
    }

    /// Chronological position of the event.
    #[must_use]
    pub const fn order_key(&self) -> &OrderKey {
        &self.order_key
    }

    /// Returns a copy of this event carrying `points` instead.
    #[must_use]
    pub fn with_points(&self, points: i64) -> Self {
        Self {
            payer: self.payer.clone(),
            points,
            order_key: self.order_key,
        }
    }

    /// Sums two events of the same payer.
    ///
    /// The result keeps the earliest of both order keys, so repeatedly
    /// merging a payer's events preserves how old its first points are.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IncompatiblePayer`] if the payers differ, and
    /// [`LedgerError::Inconsistent`] if the sum overflows.
    pub fn merge(&self, other: &Self) -> Result<Self, LedgerError> {
        if self.payer != other.payer {
            return Err(LedgerError::IncompatiblePayer {
                left: self.payer.clone(),
                right: other.payer.clone(),
            });
        }
        let points = self.points.checked_add(other.points).ok_or_else(|| {
            LedgerError::Inconsistent(format!("merged total of payer `{}` overflows", self.payer))
        })?;
        Ok(Self {
            payer: self.payer.clone(),
            points,
            order_key: self.order_key.min(other.order_key),
        })
    }
}

impl PartialEq for PointEvent {
    fn eq(&self, other: &Self) -> bool {
        self.order_key == other.order_key
    }
}

impl Eq for PointEvent {}

impl PartialOrd for PointEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PointEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key.cmp(&other.order_key)
    }
}
