//! Table Browsing REST API Routes
//!
//! `GET /api/tables` lists user tables; `GET /api/table/{identifier}` returns
//! one relabelled page of rows. Both go through the [`TableBrowser`], so the
//! identifier and limit are validated before the database is touched.

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tablescope_core::{TableBrowser, TablePage};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::parse_limit;

// ============================================================================
// TYPES
// ============================================================================

/// Response for `GET /api/tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TablesResponse {
    /// `schema.table` names ordered by schema, then table
    pub tables: Vec<String>,
}

/// Query parameters for `GET /api/table/{identifier}`.
///
/// `limit` stays a string so a non-integer value is reported as
/// `INVALID_FORMAT` rather than axum's plain-text rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct TableQuery {
    /// Maximum rows to return, 1 to 5000 (default 100)
    #[cfg_attr(feature = "openapi", param(value_type = Option<i64>))]
    pub limit: Option<String>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/tables - List user tables
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/tables",
    tag = "Tables",
    responses(
        (status = 200, description = "User tables", body = TablesResponse),
        (status = 500, description = "Catalog query failed", body = ApiError),
    ),
))]
pub async fn list_tables(State(browser): State<TableBrowser>) -> ApiResult<Json<TablesResponse>> {
    let tables = browser.list_tables().await?;
    Ok(Json(TablesResponse {
        tables: tables.iter().map(ToString::to_string).collect(),
    }))
}

/// GET /api/table/{identifier} - Read a page of rows
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/table/{identifier}",
    tag = "Tables",
    params(
        ("identifier" = String, Path, description = "Percent-encoded `schema.table` or `table`"),
        TableQuery,
    ),
    responses(
        (status = 200, description = "Rows keyed by display label", body = TablePage),
        (status = 400, description = "Invalid identifier or limit", body = ApiError),
        (status = 500, description = "Query failed", body = ApiError),
    ),
))]
pub async fn read_table(
    State(browser): State<TableBrowser>,
    path: Result<Path<String>, PathRejection>,
    Query(params): Query<TableQuery>,
) -> ApiResult<Json<TablePage>> {
    let Path(identifier) = path.map_err(identifier_rejection)?;
    let limit = parse_limit(params.limit.as_deref())?;
    let page = browser.read_table(&identifier, limit).await?;
    Ok(Json(page))
}

/// Undecodable path segments (for example `%FF`) are identifier errors, not
/// axum's plain-text rejection.
fn identifier_rejection(rejection: PathRejection) -> ApiError {
    match rejection {
        PathRejection::FailedToDeserializePathParams(inner) => {
            ApiError::invalid_identifier(inner.body_text())
        }
        other => ApiError::internal_error(other.body_text()),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the table browsing router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/table/:identifier", get(read_table))
}
