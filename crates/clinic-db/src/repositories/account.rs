//! PostgreSQL adapter over the identity framework's account tables
//!
//! Implements both `IdentityProvider` and `LockoutRepository`; the lockout
//! columns live on the account row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{instrument, warn};

use clinic_core::entities::{AccountClaims, AccountRecord, LockoutState};
use clinic_core::error::DomainError;
use clinic_core::traits::{IdentityProvider, LockoutRepository, RepoResult};
use clinic_core::value_objects::AccountId;

use crate::models::{AccountModel, LockoutModel};

use super::error::{account_not_found, map_db_error};

/// PostgreSQL implementation of IdentityProvider and LockoutRepository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PgAccountRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<AccountRecord>> {
        let result = sqlx::query_as::<_, AccountModel>(
            r"
            SELECT id, email, username, email_confirmed
            FROM accounts
            WHERE lower(email) = lower($1)
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(AccountRecord::from))
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<AccountRecord>> {
        let result = sqlx::query_as::<_, AccountModel>(
            r"
            SELECT id, email, username, email_confirmed
            FROM accounts
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(AccountRecord::from))
    }

    #[instrument(skip(self, password))]
    async fn verify_password(&self, account_id: AccountId, password: &str) -> RepoResult<bool> {
        let hash = sqlx::query_scalar::<_, String>(
            r"
            SELECT password_hash FROM accounts WHERE id = $1
            ",
        )
        .bind(account_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(hash) = hash else {
            return Ok(false);
        };

        let password = password.to_owned();
        tokio::task::spawn_blocking(move || clinic_common::verify_password(&password, &hash))
            .await
            .map_err(|e| DomainError::InternalError(format!("password check task failed: {e}")))?
            .map_err(|e| {
                warn!(%account_id, "Stored password hash is unreadable");
                DomainError::InternalError(e.to_string())
            })
    }

    #[instrument(skip_all)]
    async fn verify_dummy_password(&self, password: &str) {
        let password = password.to_owned();
        let _ = tokio::task::spawn_blocking(move || clinic_common::verify_dummy_password(&password))
            .await;
    }

    #[instrument(skip(self))]
    async fn resolve_claims(&self, account_id: AccountId) -> RepoResult<Option<AccountClaims>> {
        let tenant = sqlx::query_scalar::<_, Option<String>>(
            r"
            SELECT tenant_id FROM accounts WHERE id = $1
            ",
        )
        .bind(account_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(tenant_id) = tenant else {
            return Ok(None);
        };

        let roles = sqlx::query_scalar::<_, String>(
            r"
            SELECT role FROM account_roles WHERE account_id = $1 ORDER BY role
            ",
        )
        .bind(account_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(Some(AccountClaims::new(roles, tenant_id)))
    }
}

#[async_trait]
impl LockoutRepository for PgAccountRepository {
    #[instrument(skip(self))]
    async fn get_lockout_state(&self, account_id: AccountId) -> RepoResult<LockoutState> {
        let result = sqlx::query_as::<_, LockoutModel>(
            r"
            SELECT failed_login_attempts, lockout_until FROM accounts WHERE id = $1
            ",
        )
        .bind(account_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result
            .map(LockoutState::from)
            .ok_or_else(|| account_not_found(account_id))
    }

    #[instrument(skip(self))]
    async fn record_failed_attempt(
        &self,
        account_id: AccountId,
        threshold: i32,
        lockout_until: DateTime<Utc>,
    ) -> RepoResult<LockoutState> {
        let result = sqlx::query_as::<_, LockoutModel>(
            r"
            UPDATE accounts
            SET failed_login_attempts = failed_login_attempts + 1,
                lockout_until = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN $3
                    ELSE lockout_until
                END
            WHERE id = $1
            RETURNING failed_login_attempts, lockout_until
            ",
        )
        .bind(account_id.into_inner())
        .bind(threshold)
        .bind(lockout_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result
            .map(LockoutState::from)
            .ok_or_else(|| account_not_found(account_id))
    }

    #[instrument(skip(self))]
    async fn reset(&self, account_id: AccountId) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE accounts
            SET failed_login_attempts = 0, lockout_until = NULL
            WHERE id = $1
            ",
        )
        .bind(account_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(account_not_found(account_id));
        }

        Ok(())
    }
}
