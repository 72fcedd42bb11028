//! Service layer: business logic orchestration.
//!
//! [`PointsService`] resolves each user's ledger through the
//! [`super::domain::LedgerRegistry`] and runs the requested operation on it.

pub mod points_service;

pub use points_service::PointsService;
