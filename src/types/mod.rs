use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

// ============= Identity Types =============

/// Role carried by a token and stored with each identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(AppError::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// JWT payload. `iat` and `exp` are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Public view of an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub email: String,
    pub role: Role,
}

impl From<&Claims> for UserInfo {
    fn from(claims: &Claims) -> Self {
        Self {
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

// ============= Authentication Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: Claims,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Success envelope shared by the data endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

// ============= Test Configuration Types =============

/// One arithmetic question: the participant adds `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionPair {
    pub a: i64,
    pub b: i64,
}

/// Resolved test configuration handed to clients, with a freshly selected
/// question set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub question_count: i64,
    pub duration_seconds: i64,
    pub max_incorrect_answers: i64,
    pub min_questions_per_minute: i64,
    pub pairs: Vec<QuestionPair>,
}

/// Administrator update request. Fields stay loosely typed so that bad input
/// can be replaced by defaults instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub question_count: Option<serde_json::Value>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub duration_seconds: Option<serde_json::Value>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub max_incorrect_answers: Option<serde_json::Value>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub min_questions_per_minute: Option<serde_json::Value>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<QuestionPair>>)]
    pub pairs: Option<serde_json::Value>,
    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub regenerate: Option<serde_json::Value>,
}

/// Immutable configuration record as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub id: String,
    pub total_questions: i64,
    pub duration_seconds: i64,
    pub max_incorrect_answers: Option<i64>,
    pub min_questions_per_minute: Option<i64>,
    /// Unix milliseconds
    pub created_at: i64,
}

/// Fields for a new snapshot; id and timestamp are assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewConfigSnapshot {
    pub total_questions: i64,
    pub duration_seconds: i64,
    pub max_incorrect_answers: i64,
    pub min_questions_per_minute: i64,
}

// ============= Test Result Types =============

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTestResult {
    #[serde(default)]
    pub participant_name: String,
    #[serde(default)]
    pub participant_email: String,
    #[serde(default, alias = "participantPendidikan")]
    pub participant_education: Option<String>,
    #[serde(default, alias = "participantNoHp")]
    pub participant_phone: Option<String>,
    #[serde(default)]
    pub total_questions: i64,
    #[serde(default)]
    pub correct_answers: i64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub is_passed: bool,
    #[serde(default)]
    pub total_time: i64,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub answers: serde_json::Value,
}

impl NewTestResult {
    /// Name and email are the only mandatory fields.
    pub fn validate(&self) -> Result<()> {
        if self.participant_name.trim().is_empty() || self.participant_email.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "participantName and participantEmail are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    pub participant_name: String,
    pub participant_email: String,
    pub participant_education: Option<String>,
    pub participant_phone: Option<String>,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub score: f64,
    pub is_passed: bool,
    pub total_time: i64,
    #[schema(value_type = Object)]
    pub answers: serde_json::Value,
    /// Unix milliseconds
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultStatistics {
    pub total_tests: i64,
    pub average_score: f64,
    pub average_time: i64,
    pub highest_score: f64,
    pub lowest_score: f64,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Access denied")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AppError::InvalidCredentials | AppError::MissingToken | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(detail) | AppError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Server error".to_string()
            }
            AppError::NotFound(msg) | AppError::InvalidInput(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "message": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
