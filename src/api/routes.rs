use crate::api::handlers::{auth, config, health, results};
use crate::auth::middleware::{require_admin, require_auth};
use crate::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// API routes (mounted under `/api` by [`app`]).
pub fn create_router(state: &AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/config", get(config::get_config))
        .route(
            "/test-results",
            get(results::list_results).post(results::create_result),
        )
        .route("/test-results/{id}", get(results::get_result))
        .route("/test-results/email/{email}", get(results::results_by_email))
        .route("/statistics", get(results::statistics));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            require_auth,
        ));

    let admin_routes = Router::new()
        .route("/config", post(config::update_config))
        .route("/questions", get(config::config_history))
        .route("/test-results/{id}", delete(results::delete_result))
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            require_admin,
        ));

    public_routes.merge(protected_routes).merge(admin_routes)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unusable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86_400))
}

/// Complete application: `/api` routes, CORS, security headers and request
/// tracing.
pub fn app(state: AppState) -> Router {
    let router = Router::new().nest("/api", create_router(&state));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", crate::api::ApiDoc::openapi()),
        )
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("SAMEORIGIN"),
                )),
        )
        .with_state(state)
}
