//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize`; bodies with user input also
//! implement `Validate`.

use serde::Deserialize;
use validator::Validate;

/// Login request
///
/// `identifier` accepts an email address or a username; `email` and
/// `username` are accepted as aliases.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, max = 254, message = "Identifier must be 1-254 characters"))]
    pub identifier: String,

    #[validate(length(min = 1, max = 1024, message = "Password is required"))]
    pub password: String,
}

/// Token refresh request
///
/// Web clients send the token in the cookie and may omit the body field.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Logout request (optional refresh token to revoke)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}
