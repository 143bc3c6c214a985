//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.

use chrono::{DateTime, Utc};
use clinic_common::AccessClaims;
use clinic_core::RefreshToken;
use serde::Serialize;
use uuid::Uuid;

use crate::services::SessionTokens;

// ============================================================================
// Auth Responses
// ============================================================================

/// Token pair returned by login and refresh
///
/// The refresh token is only present for clients that receive it in the body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_confirmed: Option<bool>,
}

impl TokenResponse {
    pub fn from_session(tokens: SessionTokens, include_refresh: bool) -> Self {
        let (refresh_token, refresh_token_expires_at) = if include_refresh {
            (Some(tokens.refresh_token), Some(tokens.refresh_token_expires_at))
        } else {
            (None, None)
        };

        Self {
            access_token: tokens.access_token,
            token_type: "Bearer",
            expires_in: tokens.expires_in,
            refresh_token,
            refresh_token_expires_at,
            email_confirmed: tokens.email_confirmed,
        }
    }
}

/// Simple acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub message: String,
    pub revoked: u64,
}

/// Identity carried by the presented access token
#[derive(Debug, Serialize)]
pub struct CurrentAccountResponse {
    pub account_id: String,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<AccessClaims> for CurrentAccountResponse {
    fn from(claims: AccessClaims) -> Self {
        Self {
            account_id: claims.sub.to_string(),
            expires_at: claims.expires_at(),
            roles: claims.roles.into_iter().collect(),
            tenant_id: claims.tenant_id,
        }
    }
}

/// One active refresh token; the token value itself is never exposed
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_ip: Option<String>,
}

impl From<RefreshToken> for SessionResponse {
    fn from(token: RefreshToken) -> Self {
        Self {
            id: token.id,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
            created_by_ip: token.created_by_ip,
        }
    }
}

// ============================================================================
// Health Responses
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: String,
}
