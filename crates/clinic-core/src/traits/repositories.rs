//! Repository traits (ports) - define the interface for data access
//!
//! The session subsystem defines what it needs from storage and from the
//! identity framework; the infrastructure layer provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{AccountClaims, AccountRecord, LockoutState, RefreshToken};
use crate::error::DomainError;
use crate::value_objects::AccountId;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Refresh Token Repository
// ============================================================================

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a new token record
    async fn insert(&self, token: &RefreshToken) -> RepoResult<()>;

    /// Find a record by token value regardless of state
    async fn find_by_token(&self, token: &str) -> RepoResult<Option<RefreshToken>>;

    /// Find a record only if it is active at `now`
    async fn find_active(&self, token: &str, now: DateTime<Utc>) -> RepoResult<Option<RefreshToken>>;

    /// Revoke a token if it is not revoked yet
    ///
    /// Returns `true` only for the call that performed the transition.
    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
        replaced_by_token: Option<&str>,
    ) -> RepoResult<bool>;

    /// Revoke every token of the account that is active at `at`
    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
    ) -> RepoResult<u64>;

    /// List tokens of the account that are active at `now`, newest first
    async fn list_active_for_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<RefreshToken>>;

    /// Delete revoked records and records expired at `now`
    async fn delete_expired_or_revoked(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

// ============================================================================
// Lockout Repository
// ============================================================================

#[async_trait]
pub trait LockoutRepository: Send + Sync {
    /// Current counter and lockout window of an account
    async fn get_lockout_state(&self, account_id: AccountId) -> RepoResult<LockoutState>;

    /// Atomically increment the failed-attempt counter
    ///
    /// When the incremented counter reaches `threshold`, `lockout_until` is
    /// set in the same write. Returns the state after the update.
    async fn record_failed_attempt(
        &self,
        account_id: AccountId,
        threshold: i32,
        lockout_until: DateTime<Utc>,
    ) -> RepoResult<LockoutState>;

    /// Zero the counter and clear the lockout window
    async fn reset(&self, account_id: AccountId) -> RepoResult<()>;
}

// ============================================================================
// Identity Provider
// ============================================================================

/// External identity collaborator (account lookup, password check, claims)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Find an account by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<AccountRecord>>;

    /// Find an account by username
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<AccountRecord>>;

    /// Check a password against the account's stored credential
    async fn verify_password(&self, account_id: AccountId, password: &str) -> RepoResult<bool>;

    /// Verify a password against a throwaway hash so that misses cost the
    /// same as hits
    async fn verify_dummy_password(&self, password: &str);

    /// Current roles and tenant of the account
    async fn resolve_claims(&self, account_id: AccountId) -> RepoResult<Option<AccountClaims>>;
}
