use crate::{
    auth::middleware::AuthUser,
    types::{ApiResponse, ConfigSnapshot, ConfigView, Result, UpdateConfigRequest},
    AppState,
};
use axum::{extract::State, Json};

/// Snapshot history returned by `GET /api/questions`.
const HISTORY_LIMIT: u32 = 50;

/// Current test configuration with a fresh question set
#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Resolved configuration", body = ApiResponse<ConfigView>)
    ),
    tag = "config"
)]
pub async fn get_config(State(state): State<AppState>) -> Result<Json<ApiResponse<ConfigView>>> {
    let view = state.test_config.current().await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// Record a new configuration snapshot
#[utoipa::path(
    post,
    path = "/api/config",
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Configuration saved", body = ApiResponse<ConfigView>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Administrator role required")
    ),
    security(("bearer" = [])),
    tag = "config"
)]
pub async fn update_config(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateConfigRequest>,
) -> Result<Json<ApiResponse<ConfigView>>> {
    let view = state.test_config.update(&payload, &claims).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// Configuration history, newest first
#[utoipa::path(
    get,
    path = "/api/questions",
    responses(
        (status = 200, description = "Recent snapshots", body = ApiResponse<Vec<ConfigSnapshot>>),
        (status = 403, description = "Administrator role required")
    ),
    security(("bearer" = [])),
    tag = "config"
)]
pub async fn config_history(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ConfigSnapshot>>>> {
    let snapshots = state.test_config.history(HISTORY_LIMIT).await?;
    Ok(Json(ApiResponse::ok(snapshots)))
}
