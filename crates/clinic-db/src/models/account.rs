//! Account projections read from the identity framework's tables

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Columns of `accounts` needed to authenticate
#[derive(Debug, Clone, FromRow)]
pub struct AccountModel {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub email_confirmed: bool,
}

/// Lockout columns of `accounts`
#[derive(Debug, Clone, Copy, FromRow)]
pub struct LockoutModel {
    pub failed_login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
}
