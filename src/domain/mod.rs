//! Domain layer: point events, per-user ledgers, and the ledger registry.
//!
//! This module contains the points engine itself: the totally ordered
//! [`PointEvent`], the [`Ledger`] that performs oldest-first deduction, the
//! [`LedgerRegistry`] that hands out one ledger per user, and the date
//! normalizer producing each event's [`OrderKey`].

pub mod ledger;
pub mod ledger_error;
pub mod ledger_registry;
pub mod order_key;
pub mod point_event;
pub mod timestamp;

pub use ledger::Ledger;
pub use ledger_error::{DeductionScope, LedgerError};
pub use ledger_registry::LedgerRegistry;
pub use order_key::OrderKey;
pub use point_event::PointEvent;
pub use timestamp::{TimestampError, normalize_date, order_key_for};
