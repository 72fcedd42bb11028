//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::PointsService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Points service for all business logic.
    pub points_service: Arc<PointsService>,
    /// Maximum accepted payer name length.
    pub payer_max_len: usize,
}
