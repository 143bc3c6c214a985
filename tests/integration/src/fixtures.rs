//! Test fixtures and data generators
//!
//! Provides reusable test data for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use clinic_core::AccountClaims;
use serde::{Deserialize, Serialize};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Account registered straight into the in-memory store
#[derive(Debug, Clone)]
pub struct SeededAccount {
    pub email: String,
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
    pub tenant_id: Option<String>,
}

impl SeededAccount {
    pub fn unique() -> Self {
        let suffix = unique_suffix();
        Self {
            email: format!("clinician{suffix}@clinic.test"),
            username: format!("clinician{suffix}"),
            password: "Sup3r-secret-pass".to_string(),
            roles: vec!["Doctor".to_string()],
            tenant_id: Some("tenant-1".to_string()),
        }
    }

    pub fn claims(&self) -> AccountClaims {
        AccountClaims::new(self.roles.iter().cloned(), self.tenant_id.clone())
    }

    pub fn login(&self) -> LoginRequest {
        LoginRequest {
            identifier: self.email.clone(),
            password: self.password.clone(),
        }
    }

    pub fn login_with_password(&self, password: &str) -> LoginRequest {
        LoginRequest {
            identifier: self.email.clone(),
            password: password.to_string(),
        }
    }
}

/// Login request
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Refresh or logout body for mobile clients
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Token pair response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<String>,
    pub email_confirmed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutAllResponse {
    pub message: String,
    pub revoked: u64,
}

#[derive(Debug, Deserialize)]
pub struct CurrentAccountResponse {
    pub account_id: String,
    pub roles: Vec<String>,
    pub tenant_id: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub issued_at: String,
    pub expires_at: String,
    pub created_by_ip: Option<String>,
}

/// Error envelope
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
