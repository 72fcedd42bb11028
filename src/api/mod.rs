//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Point endpoints are mounted under `/api/v1` and, for existing clients,
//! again at the root: `/user/{name}/points` and `/users` behave exactly like
//! their `/api/v1` counterparts. The OpenAPI document lists only the
//! `/api/v1` paths.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

pub use openapi::ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::routes())
        .merge(handlers::system::routes())
}
