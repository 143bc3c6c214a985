//! # clinic-common
//!
//! Shared utilities including configuration, error handling, access-token
//! issuance, password helpers, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    hash_password, verify_dummy_password, verify_password, AccessClaims, IssuedAccessToken, TokenIssuer,
    TokenVerification,
};
pub use config::{
    AppConfig, AppSettings, ConfigError, CookieConfig, CorsConfig, DatabaseConfig, Environment,
    JwtConfig, LockoutConfig, RateLimitConfig, RefreshTokenConfig, ServerConfig, StorageBackend,
};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
