//! User point handlers: add, deduct, and list balances.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{AddPointsRequest, DeductPointsRequest, PayerPoints, validate_user};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, PointsError};

/// `POST /user/{name}/points` — Add points (by payer) to a user.
///
/// # Errors
///
/// Returns [`PointsError`] on invalid input or when negative points exceed
/// the payer's or user's balance.
#[utoipa::path(
    post,
    path = "/api/v1/user/{name}/points",
    tag = "Points",
    summary = "Add points to a user",
    description = "Records points granted by a payer. Negative points deduct from that payer's oldest points and may not drive the payer or user below zero.",
    params(
        ("name" = String, Path, description = "User name"),
    ),
    request_body = AddPointsRequest,
    responses(
        (status = 200, description = "Points were added"),
        (status = 400, description = "Validation failed or balance would go negative", body = ErrorResponse),
    )
)]
pub async fn add_points(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<AddPointsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PointsError> {
    let user = validate_user(&name)?;
    let Json(req) = payload.map_err(|rejection| PointsError::InvalidRequest(rejection.body_text()))?;
    let event = req.into_event(state.payer_max_len)?;

    state.points_service.add_points(user, event).await?;
    Ok(StatusCode::OK)
}

/// `GET /user/{name}/points` — Point totals of a user, by payer.
///
/// # Errors
///
/// Returns [`PointsError::ValidationFailed`] if the user name is blank.
#[utoipa::path(
    get,
    path = "/api/v1/user/{name}/points",
    tag = "Points",
    summary = "Get point balances",
    description = "Returns the user's point totals aggregated by payer, ordered by each payer's earliest points.",
    params(
        ("name" = String, Path, description = "User name"),
    ),
    responses(
        (status = 200, description = "Balances by payer", body = Vec<PayerPoints>),
        (status = 400, description = "User name was blank", body = ErrorResponse),
    )
)]
pub async fn get_points(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, PointsError> {
    let user = validate_user(&name)?;
    let balances: Vec<PayerPoints> = state
        .points_service
        .balances(user)
        .await
        .iter()
        .map(PayerPoints::from)
        .collect();
    Ok(Json(balances))
}

/// `DELETE /user/{name}/points` — Spend points, oldest first.
///
/// # Errors
///
/// Returns [`PointsError`] on invalid input or when the user holds fewer
/// points than requested.
#[utoipa::path(
    delete,
    path = "/api/v1/user/{name}/points",
    tag = "Points",
    summary = "Deduct points from a user",
    description = "Spends points from the user's oldest points first, across all payers. Returns every payer slice that was deducted, oldest first.",
    params(
        ("name" = String, Path, description = "User name"),
    ),
    request_body = DeductPointsRequest,
    responses(
        (status = 200, description = "Deducted slices", body = Vec<PayerPoints>),
        (status = 400, description = "Validation failed or balance would go negative", body = ErrorResponse),
    )
)]
pub async fn deduct_points(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<DeductPointsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PointsError> {
    let user = validate_user(&name)?;
    let Json(req) = payload.map_err(|rejection| PointsError::InvalidRequest(rejection.body_text()))?;
    let amount = req.amount()?;

    let removed: Vec<PayerPoints> = state
        .points_service
        .deduct_points(user, amount)
        .await?
        .iter()
        .map(PayerPoints::from)
        .collect();
    Ok(Json(removed))
}

/// `GET /users` — Every user seen so far.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Points",
    summary = "List users",
    description = "Returns the names of every user that has been referenced, in ascending order.",
    responses(
        (status = 200, description = "Known users", body = Vec<String>),
    )
)]
pub async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.points_service.users().await)
}

/// User point routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/user/{name}/points",
            get(get_points).post(add_points).delete(deduct_points),
        )
        .route("/users", get(list_users))
}
