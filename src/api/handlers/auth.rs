use crate::{
    auth::middleware::AuthUser,
    types::{LoginRequest, LoginResponse, MeResponse, MessageResponse, Result, UserInfo},
    AppState,
};
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{AppendHeaders, IntoResponse},
    Json,
};

/// `Set-Cookie` value for the identity token. A `max_age` of zero clears it.
///
/// Production deployments serve the frontend from another site, so the
/// cookie must be `SameSite=None; Secure` there.
pub fn identity_cookie(name: &str, value: &str, max_age: i64, production: bool) -> String {
    let same_site = if production {
        "SameSite=None; Secure"
    } else {
        "SameSite=Lax"
    };
    format!("{name}={value}; Path=/; HttpOnly; Max-Age={max_age}; {same_site}")
}

fn cookie_header(cookie: String) -> Result<HeaderValue> {
    HeaderValue::from_str(&cookie)
        .map_err(|e| crate::types::AppError::Internal(format!("invalid cookie header: {e}")))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; token also set as cookie", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let identity = state
        .credentials
        .verify(&payload.email, &payload.password)
        .await?;

    let issued = state
        .authenticator
        .codec()
        .sign(&identity.email, identity.role)?;

    let cookie = cookie_header(identity_cookie(
        &state.config.auth.cookie_name,
        &issued.token,
        state.authenticator.codec().ttl_secs(),
        state.config.is_production(),
    ))?;

    tracing::info!(email = %identity.email, role = %identity.role, "login succeeded");

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            user: UserInfo::from(&issued.claims),
            token: issued.token,
        }),
    ))
}

/// Clear the identity cookie
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let cookie = cookie_header(identity_cookie(
        &state.config.auth.cookie_name,
        "",
        0,
        state.config.is_production(),
    ))?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(MessageResponse::ok("Logged out")),
    ))
}

/// Claims of the current caller
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: claims,
    })
}
