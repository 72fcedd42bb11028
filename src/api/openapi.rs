//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use crate::api::dto::{AddPointsRequest, DeductPointsRequest, PayerPoints};
use crate::api::handlers::{points, system};
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "points-ledger",
        description = "Per-user reward points with oldest-first deduction across payers. \
            Every `/api/v1` route is also served without the prefix \
            (`/user/{name}/points`, `/users`)."
    ),
    paths(
        points::add_points,
        points::get_points,
        points::deduct_points,
        points::list_users,
        system::health_handler,
    ),
    components(schemas(
        AddPointsRequest,
        DeductPointsRequest,
        PayerPoints,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Points", description = "Add, deduct, and list user points"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;
