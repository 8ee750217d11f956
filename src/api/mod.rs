//! HTTP API Handlers and Routes
//!
//! The REST layer, built on the Axum web framework. Every route lives under
//! `/api` and answers with a JSON envelope `{"success": bool, ...}`.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Authentication
//! - `POST /api/login` - Verify credentials, receive a token (body and cookie)
//! - `POST /api/logout` - Clear the identity cookie
//! - `GET /api/me` - Claims of the caller (auth)
//!
//! ## Test configuration
//! - `GET /api/config` - Current configuration with a fresh question set
//! - `POST /api/config` - Record a new snapshot (admin)
//! - `GET /api/questions` - Snapshot history (admin)
//!
//! ## Results
//! - `POST /api/test-results` - Submit a result
//! - `GET /api/test-results` - Latest results
//! - `GET /api/test-results/{id}` - One result
//! - `GET /api/test-results/email/{email}` - Results of one participant
//! - `DELETE /api/test-results/{id}` - Remove a result (admin)
//! - `GET /api/statistics` - Aggregate scores
//!
//! ## Health
//! - `GET /api/health` - Health check endpoint
//!
//! # Authentication
//!
//! Guarded endpoints accept the token from, in order of preference:
//! ```text
//! Authorization: Bearer <token>
//! Cookie: auth_token=<token>
//! ?token=<token>
//! ```
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::types::{
    ConfigSnapshot, ConfigView, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    NewTestResult, QuestionPair, ResultStatistics, Role, TestResult, UpdateConfigRequest,
    UserInfo,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document for every route in [`routes::create_router`].
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::config::get_config,
        handlers::config::update_config,
        handlers::config::config_history,
        handlers::results::create_result,
        handlers::results::list_results,
        handlers::results::get_result,
        handlers::results::results_by_email,
        handlers::results::delete_result,
        handlers::results::statistics,
    ),
    modifiers(&BearerScheme),
    components(schemas(
        Role,
        UserInfo,
        LoginRequest,
        LoginResponse,
        MeResponse,
        MessageResponse,
        QuestionPair,
        ConfigView,
        UpdateConfigRequest,
        ConfigSnapshot,
        NewTestResult,
        TestResult,
        ResultStatistics,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Login and identity"),
        (name = "config", description = "Test configuration"),
        (name = "results", description = "Test results"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme that guarded handlers reference.
struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
