//! # points-ledger
//!
//! REST service tracking reward points per user, contributed by many payers
//! over time, with auditable oldest-first deduction.
//!
//! Each user owns a [`domain::Ledger`]: a totally ordered set of point
//! events plus running totals per payer and per user, all guarded by one
//! lock. Deductions consume the chronologically oldest points first and
//! never drive a payer or the user below zero.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── PointsService (service/)
//!     │
//!     ├── LedgerRegistry (domain/)
//!     └── Ledger ── PointEvent ── OrderKey (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
