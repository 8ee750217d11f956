use crate::{
    db::ResultStore,
    types::{
        ApiResponse, AppError, MessageResponse, NewTestResult, Result, ResultStatistics,
        TestResult,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

/// Results returned by the unfiltered listing.
const LIST_LIMIT: u32 = 100;

/// Submit a finished test
#[utoipa::path(
    post,
    path = "/api/test-results",
    request_body = NewTestResult,
    responses(
        (status = 201, description = "Result stored", body = ApiResponse<TestResult>),
        (status = 400, description = "Name or email missing")
    ),
    tag = "results"
)]
pub async fn create_result(
    State(state): State<AppState>,
    Json(payload): Json<NewTestResult>,
) -> Result<(StatusCode, Json<ApiResponse<TestResult>>)> {
    payload.validate()?;

    let result = state.db.create_test_result(&payload).await?;
    tracing::info!(id = %result.id, passed = result.is_passed, "test result stored");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(result))))
}

/// Most recent results
#[utoipa::path(
    get,
    path = "/api/test-results",
    responses(
        (status = 200, description = "Newest results first", body = ApiResponse<Vec<TestResult>>)
    ),
    tag = "results"
)]
pub async fn list_results(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TestResult>>>> {
    let results = state.db.list_test_results(LIST_LIMIT).await?;
    Ok(Json(ApiResponse::ok(results)))
}

#[utoipa::path(
    get,
    path = "/api/test-results/{id}",
    params(("id" = String, Path, description = "Result ID")),
    responses(
        (status = 200, description = "Result found", body = ApiResponse<TestResult>),
        (status = 404, description = "No such result")
    ),
    tag = "results"
)]
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TestResult>>> {
    let result = state
        .db
        .get_test_result(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test result not found".to_string()))?;

    Ok(Json(ApiResponse::ok(result)))
}

#[utoipa::path(
    get,
    path = "/api/test-results/email/{email}",
    params(("email" = String, Path, description = "Participant email")),
    responses(
        (status = 200, description = "Results for one participant", body = ApiResponse<Vec<TestResult>>)
    ),
    tag = "results"
)]
pub async fn results_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<ApiResponse<Vec<TestResult>>>> {
    let results = state.db.list_test_results_by_email(&email).await?;
    Ok(Json(ApiResponse::ok(results)))
}

#[utoipa::path(
    delete,
    path = "/api/test-results/{id}",
    params(("id" = String, Path, description = "Result ID")),
    responses(
        (status = 200, description = "Result deleted", body = MessageResponse),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "No such result")
    ),
    security(("bearer" = [])),
    tag = "results"
)]
pub async fn delete_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.db.delete_test_result(&id).await? {
        return Err(AppError::NotFound("Test result not found".to_string()));
    }

    tracing::info!(%id, "test result deleted");
    Ok(Json(MessageResponse::ok("Test result deleted")))
}

/// Aggregate scores across all results
#[utoipa::path(
    get,
    path = "/api/statistics",
    responses(
        (status = 200, description = "Aggregates; zeros when empty", body = ApiResponse<ResultStatistics>)
    ),
    tag = "results"
)]
pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ResultStatistics>>> {
    let stats = state.db.result_statistics().await?;
    Ok(Json(ApiResponse::ok(stats)))
}
