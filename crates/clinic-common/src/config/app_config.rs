//! Application configuration structs
//!
//! Loads configuration from environment variables (optionally via `.env`).

use chrono::Duration;
use serde::Deserialize;
use std::{env, str::FromStr};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub refresh: RefreshTokenConfig,
    pub lockout: LockoutConfig,
    pub cookie: CookieConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
    #[serde(default)]
    pub storage: StorageBackend,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

/// Where refresh tokens and accounts live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local maps; state is lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend `{other}`")),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,
}

/// Access token signing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Refresh token lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenConfig {
    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub expiry: i64,
    /// Seconds between purge sweeps
    #[serde(default = "default_purge_interval")]
    pub purge_interval: u64,
    /// Seconds after rotation during which the parent is treated as a lost race
    #[serde(default = "default_reuse_grace")]
    pub reuse_grace: i64,
    #[serde(default = "default_true")]
    pub revoke_chain_on_replay: bool,
}

impl RefreshTokenConfig {
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        Duration::seconds(self.expiry)
    }

    #[must_use]
    pub fn reuse_grace(&self) -> Duration {
        Duration::seconds(self.reuse_grace)
    }

    #[must_use]
    pub fn purge_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.purge_interval.max(1))
    }
}

/// Account lockout policy
#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: i32,
    /// Lockout length in seconds
    #[serde(default = "default_lockout_duration")]
    pub duration: i64,
}

impl LockoutConfig {
    #[must_use]
    pub fn lockout_duration(&self) -> Duration {
        Duration::seconds(self.duration)
    }
}

/// Refresh cookie attributes for browser clients
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub secure: bool,
    #[serde(default = "default_cookie_path")]
    pub path: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "clinic-auth".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_migrations_dir() -> String {
    "./migrations".to_string()
}

fn default_issuer() -> String {
    "clinic-auth".to_string()
}

fn default_audience() -> String {
    "clinic-api".to_string()
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> i64 {
    604_800 // 7 days
}

fn default_purge_interval() -> u64 {
    3600
}

fn default_reuse_grace() -> i64 {
    5
}

fn default_max_failed_attempts() -> i32 {
    5
}

fn default_lockout_duration() -> i64 {
    1800 // 30 minutes
}

fn default_cookie_name() -> String {
    "refresh_token".to_string()
}

fn default_cookie_path() -> String {
    "/auth".to_string()
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

/// Read and parse an optional variable; a present but unparsable value is an error
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        _ => Ok(None),
    }
}

fn parse_bool(name: &'static str) -> Result<Option<bool>, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(name, raw)),
        },
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = parse_var("STORAGE_BACKEND")?.unwrap_or_default();

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if storage == StorageBackend::Memory => String::new(),
            Err(_) => return Err(ConfigError::MissingVar("DATABASE_URL")),
        };

        let config = Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: parse_var("APP_ENV")?.unwrap_or_default(),
                storage,
            },
            api: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("API_PORT")?.ok_or(ConfigError::MissingVar("API_PORT"))?,
                request_timeout_secs: parse_var("API_REQUEST_TIMEOUT")?
                    .unwrap_or_else(default_request_timeout),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
                run_migrations: parse_bool("DATABASE_RUN_MIGRATIONS")?.unwrap_or(false),
                migrations_dir: env::var("DATABASE_MIGRATIONS_DIR")
                    .unwrap_or_else(|_| default_migrations_dir()),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| default_issuer()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| default_audience()),
                access_token_expiry: parse_var("JWT_ACCESS_TOKEN_EXPIRY")?
                    .unwrap_or_else(default_access_token_expiry),
            },
            refresh: RefreshTokenConfig {
                expiry: parse_var("REFRESH_TOKEN_EXPIRY")?
                    .unwrap_or_else(default_refresh_token_expiry),
                purge_interval: parse_var("REFRESH_TOKEN_PURGE_INTERVAL")?
                    .unwrap_or_else(default_purge_interval),
                reuse_grace: parse_var("REFRESH_REUSE_GRACE")?.unwrap_or_else(default_reuse_grace),
                revoke_chain_on_replay: parse_bool("REFRESH_REVOKE_CHAIN_ON_REPLAY")?
                    .unwrap_or(true),
            },
            lockout: LockoutConfig {
                max_failed_attempts: parse_var("LOCKOUT_MAX_FAILED_ATTEMPTS")?
                    .unwrap_or_else(default_max_failed_attempts),
                duration: parse_var("LOCKOUT_DURATION")?.unwrap_or_else(default_lockout_duration),
            },
            cookie: CookieConfig {
                name: env::var("COOKIE_NAME").unwrap_or_else(|_| default_cookie_name()),
                secure: parse_bool("COOKIE_SECURE")?.unwrap_or(true),
                path: env::var("COOKIE_PATH").unwrap_or_else(|_| default_cookie_path()),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: parse_var("RATE_LIMIT_REQUESTS_PER_SECOND")?
                    .unwrap_or_else(default_requests_per_second),
                burst: parse_var("RATE_LIMIT_BURST")?.unwrap_or_else(default_burst),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Defaults with in-memory storage, for tests and local tooling
    #[must_use]
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: Environment::Development,
                storage: StorageBackend::Memory,
            },
            api: ServerConfig {
                host: default_host(),
                port: 0,
                request_timeout_secs: default_request_timeout(),
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                run_migrations: false,
                migrations_dir: default_migrations_dir(),
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                issuer: default_issuer(),
                audience: default_audience(),
                access_token_expiry: default_access_token_expiry(),
            },
            refresh: RefreshTokenConfig {
                expiry: default_refresh_token_expiry(),
                purge_interval: default_purge_interval(),
                reuse_grace: default_reuse_grace(),
                revoke_chain_on_replay: true,
            },
            lockout: LockoutConfig {
                max_failed_attempts: default_max_failed_attempts(),
                duration: default_lockout_duration(),
            },
            cookie: CookieConfig {
                name: default_cookie_name(),
                secure: false,
                path: default_cookie_path(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_requests_per_second(),
                burst: default_burst(),
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
            },
        }
    }

    /// Reject values that would make the auth flows misbehave
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` naming the offending variable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.is_empty() {
            return Err(ConfigError::MissingVar("JWT_SECRET"));
        }
        if self.jwt.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_TOKEN_EXPIRY",
                self.jwt.access_token_expiry.to_string(),
            ));
        }
        if self.refresh.expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "REFRESH_TOKEN_EXPIRY",
                self.refresh.expiry.to_string(),
            ));
        }
        if self.refresh.reuse_grace < 0 {
            return Err(ConfigError::InvalidValue(
                "REFRESH_REUSE_GRACE",
                self.refresh.reuse_grace.to_string(),
            ));
        }
        if self.lockout.max_failed_attempts < 1 {
            return Err(ConfigError::InvalidValue(
                "LOCKOUT_MAX_FAILED_ATTEMPTS",
                self.lockout.max_failed_attempts.to_string(),
            ));
        }
        if self.lockout.duration <= 0 {
            return Err(ConfigError::InvalidValue(
                "LOCKOUT_DURATION",
                self.lockout.duration.to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
