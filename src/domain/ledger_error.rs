//! Errors raised by the points ledger engine.
//!
//! Every variant is detected before the ledger is mutated, so a failed
//! operation always leaves the ledger exactly as it was.

use std::fmt;

/// Which balance a rejected deduction would have driven negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeductionScope {
    /// Negative-points addition restricted to one payer.
    Payer,
    /// Oldest-first deduction across every payer of the user.
    User,
}

impl fmt::Display for DeductionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payer => f.write_str("payer"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Ledger engine error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A deduction would drive a payer's or the user's total below zero.
    #[error(
        "cannot deduct {amount} points from {scope} balance of user `{user}`{}: negative balances are prohibited",
        payer_suffix(.payer)
    )]
    InvalidDeduction {
        /// Balance that would have gone negative.
        scope: DeductionScope,
        /// Owner of the ledger.
        user: String,
        /// Payer for payer-scoped deductions.
        payer: Option<String>,
        /// Requested amount (always positive).
        amount: i64,
    },

    /// Two events for different payers were merged.
    #[error("cannot merge points of payer `{left}` with payer `{right}`")]
    IncompatiblePayer {
        /// Payer of the left-hand event.
        left: String,
        /// Payer of the right-hand event.
        right: String,
    },

    /// A credit would overflow a 64-bit total.
    #[error("adding points for payer `{payer}` would overflow the balance of user `{user}`")]
    BalanceOverflow {
        /// Owner of the ledger.
        user: String,
        /// Payer being credited.
        payer: String,
    },

    /// Whole-user deductions must request at least one point.
    #[error("deduction amount must be positive, got {0}")]
    NonPositiveDeduction(i64),

    /// Internal bookkeeping disagreed with the ordered events.
    #[error("ledger inconsistency: {0}")]
    Inconsistent(String),
}

fn payer_suffix(payer: &Option<String>) -> String {
    payer
        .as_ref()
        .map(|p| format!(" (payer `{p}`)"))
        .unwrap_or_default()
}
