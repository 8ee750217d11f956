//! TOML-based configuration for the Kraepelin server
//!
//! Settings live in `kraepelin.toml`. Secrets are never written to the file;
//! the file names the environment variables that hold them.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! environment = "development"
//!
//! [auth]
//! jwt_secret_env = "JWT_SECRET"
//! deprecated_secret_envs = ["JWT_SECRET_PREVIOUS"]
//!
//! [auth.admin]
//! email = "admin@example.com"
//! password_env = "ADMIN_PASSWORD"
//!
//! [database]
//! url = "./data/kraepelin.db"
//! ```

use crate::auth::extract::{AUTH_COOKIE_NAME, TOKEN_QUERY_PARAM};
use crate::auth::jwt::DEFAULT_TOKEN_TTL_SECS;
use crate::quiz::TestDefaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `server.environment`.
pub const ENVIRONMENT_ENV: &str = "KRAEPELIN_ENV";

/// Root configuration structure loaded from kraepelin.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Fallbacks used by the test configuration service
    #[serde(default)]
    pub quiz: TestDefaults,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub environment: Environment,

    /// Deployed frontend origin, added to the CORS allow list
    pub frontend_url: Option<String>,

    /// Extra CORS origins
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            environment: Environment::default(),
            frontend_url: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Local dev origins plus `frontend_url` and `allowed_origins`, deduplicated.
    pub fn cors_origins(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();

        [
            "http://localhost:5173",
            "http://localhost:3000",
            "http://127.0.0.1:5173",
        ]
        .into_iter()
        .chain(self.frontend_url.as_deref())
        .chain(self.allowed_origins.iter().map(String::as_str))
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty() && seen.insert(origin.clone()))
        .collect()
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the signing secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// Environment variables holding retired secrets that still verify
    #[serde(default)]
    pub deprecated_secret_envs: Vec<String>,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_query_param")]
    pub query_param: String,

    /// Privileged administrator, never persisted
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: String,

    /// Environment variable name containing the administrator password
    #[serde(default = "default_admin_password_env")]
    pub password_env: String,
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}

fn default_token_ttl_secs() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_cookie_name() -> String {
    AUTH_COOKIE_NAME.to_string()
}

fn default_query_param() -> String {
    TOKEN_QUERY_PARAM.to_string()
}

fn default_admin_password_env() -> String {
    "ADMIN_PASSWORD".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            deprecated_secret_envs: Vec::new(),
            token_ttl_secs: default_token_ttl_secs(),
            cookie_name: default_cookie_name(),
            query_param: default_query_param(),
            admin: None,
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "./data/kraepelin.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl AppConfig {
    /// Load and validate configuration from a TOML file, then apply the
    /// `KRAEPELIN_ENV` override.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without checking secrets. Used by commands that never issue
    /// tokens, such as `seed`.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(ENVIRONMENT_ENV) {
            self.server.environment = match value.trim().to_ascii_lowercase().as_str() {
                "production" => Environment::Production,
                "development" | "" => Environment::Development,
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "{ENVIRONMENT_ENV} must be 'development' or 'production', got '{other}'"
                    )))
                }
            };
        }
        Ok(())
    }

    /// Checks that referenced env vars exist and values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.jwt_secret()?;
        if secret.len() < 32 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least 32 characters",
                self.auth.jwt_secret_env
            )));
        }

        if let Some(admin) = &self.auth.admin {
            if admin.email.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "auth.admin.email must not be empty".to_string(),
                ));
            }
            self.validate_env_var(&admin.password_env)?;
        }

        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_secs must be positive".to_string(),
            ));
        }

        if self.auth.cookie_name.trim().is_empty() || self.auth.query_param.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.cookie_name and auth.query_param must not be empty".to_string(),
            ));
        }

        self.validate_quiz()
    }

    fn validate_quiz(&self) -> Result<(), ConfigError> {
        let quiz = &self.quiz;

        if quiz.max_question_count <= 0 {
            return Err(ConfigError::ValidationError(
                "quiz.max_question_count must be positive".to_string(),
            ));
        }
        if !quiz.accepts_question_count(quiz.question_count) {
            return Err(ConfigError::ValidationError(format!(
                "quiz.question_count must be between 1 and {}",
                quiz.max_question_count
            )));
        }
        if quiz.duration_seconds <= 0 {
            return Err(ConfigError::ValidationError(
                "quiz.duration_seconds must be positive".to_string(),
            ));
        }
        if quiz.max_incorrect_answers < 0 || quiz.min_questions_per_minute < 0 {
            return Err(ConfigError::ValidationError(
                "quiz thresholds must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get the JWT secret from the environment
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.auth.jwt_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
    }

    /// Retired secrets that are set; unset variables are skipped with a warning.
    pub fn deprecated_secrets(&self) -> Vec<String> {
        self.auth
            .deprecated_secret_envs
            .iter()
            .filter_map(|name| {
                let value = self.resolve_env(name);
                if value.is_none() {
                    tracing::warn!(env = %name, "deprecated secret variable is not set");
                }
                value
            })
            .collect()
    }

    /// Administrator password, if an administrator is configured.
    pub fn admin_password(&self) -> Result<Option<(String, String)>, ConfigError> {
        match &self.auth.admin {
            Some(admin) => {
                let password = self
                    .resolve_env(&admin.password_env)
                    .ok_or_else(|| ConfigError::MissingEnvVar(admin.password_env.clone()))?;
                Ok(Some((admin.email.clone(), password)))
            }
            None => Ok(None),
        }
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET: &str = "toml-config-test-secret-32-characters";

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_full_config() {
        // each test uses its own variable names
        std::env::set_var("CFG_FULL_JWT", SECRET);
        std::env::set_var("CFG_FULL_ADMIN", "hunter22");

        let file = write_config(
            r#"
[server]
host = "0.0.0.0"
port = 8080
log_format = "json"
frontend_url = "https://tes.example.id/"

[auth]
jwt_secret_env = "CFG_FULL_JWT"
token_ttl_secs = 3600

[auth.admin]
email = "admin@example.id"
password_env = "CFG_FULL_ADMIN"

[database]
url = ":memory:"

[quiz]
question_count = 100
"#,
        );

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.auth.cookie_name, "auth_token");
        assert_eq!(config.quiz.question_count, 100);
        assert_eq!(config.quiz.duration_seconds, 900);
        assert_eq!(
            config.admin_password().unwrap(),
            Some(("admin@example.id".to_string(), "hunter22".to_string()))
        );
        assert!(config
            .server
            .cors_origins()
            .contains(&"https://tes.example.id".to_string()));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("/nonexistent/kraepelin.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_missing_secret_env() {
        let file = write_config(
            r#"
[auth]
jwt_secret_env = "CFG_DEFINITELY_UNSET_SECRET"
"#,
        );

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "CFG_DEFINITELY_UNSET_SECRET"));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        std::env::set_var("CFG_SHORT_JWT", "short");
        let file = write_config("[auth]\njwt_secret_env = \"CFG_SHORT_JWT\"\n");

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_invalid_quiz_defaults_are_rejected() {
        std::env::set_var("CFG_QUIZ_JWT", SECRET);

        for quiz in [
            "question_count = 0",
            "question_count = 20000",
            "duration_seconds = 0",
            "max_incorrect_answers = -1",
            "min_questions_per_minute = -1",
            "max_question_count = 0",
        ] {
            let file = write_config(&format!(
                "[auth]\njwt_secret_env = \"CFG_QUIZ_JWT\"\n\n[quiz]\n{quiz}\n"
            ));

            let err = AppConfig::load(file.path()).unwrap_err();
            assert!(
                matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("quiz")),
                "{quiz}: {err}"
            );
        }
    }

    #[test]
    fn test_deprecated_secrets_skip_unset() {
        std::env::set_var("CFG_OLD_ONE", "old-secret-one");
        let mut config = AppConfig::default();
        config.auth.deprecated_secret_envs =
            vec!["CFG_OLD_ONE".to_string(), "CFG_OLD_UNSET".to_string()];

        assert_eq!(config.deprecated_secrets(), vec!["old-secret-one".to_string()]);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.auth.jwt_secret_env, "JWT_SECRET");
        assert_eq!(config.auth.token_ttl_secs, 86400);
        assert_eq!(config.database.url, "./data/kraepelin.db");
        assert!(!config.is_production());
    }

    #[test]
    fn test_cors_origins_deduplicate() {
        let server = ServerConfig {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "https://admin.example.id".to_string(),
            ],
            ..Default::default()
        };

        let origins = server.cors_origins();
        assert_eq!(origins.len(), 4);
        assert_eq!(origins.last().map(String::as_str), Some("https://admin.example.id"));
    }
}
