//! PostgreSQL implementation of RefreshTokenRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use clinic_core::entities::RefreshToken;
use clinic_core::error::DomainError;
use clinic_core::traits::{RefreshTokenRepository, RepoResult};
use clinic_core::value_objects::AccountId;

use crate::models::RefreshTokenModel;

use super::error::{map_db_error, map_unique_violation};

const SELECT_COLUMNS: &str = r"
    SELECT id, token, account_id, issued_at, expires_at, created_by_ip, revoked_by_ip,
           is_revoked, revoked_at, replaced_by_token
    FROM refresh_tokens
";

/// PostgreSQL implementation of RefreshTokenRepository
///
/// Revocation is a conditional `UPDATE ... WHERE is_revoked = FALSE`, so two
/// processes racing on one token see exactly one winner.
#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    #[instrument(skip(self, token), fields(account_id = %token.account_id))]
    async fn insert(&self, token: &RefreshToken) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO refresh_tokens
                (id, token, account_id, issued_at, expires_at, created_by_ip, revoked_by_ip,
                 is_revoked, revoked_at, replaced_by_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(token.id)
        .bind(&token.token)
        .bind(token.account_id.into_inner())
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(&token.created_by_ip)
        .bind(&token.revoked_by_ip)
        .bind(token.is_revoked)
        .bind(token.revoked_at)
        .bind(&token.replaced_by_token)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::DuplicateTokenValue))?;

        Ok(())
    }

    #[instrument(skip_all)]
    async fn find_by_token(&self, token: &str) -> RepoResult<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshTokenModel>(&format!(
            "{SELECT_COLUMNS} WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(RefreshToken::from))
    }

    #[instrument(skip(self, token))]
    async fn find_active(&self, token: &str, now: DateTime<Utc>) -> RepoResult<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshTokenModel>(&format!(
            "{SELECT_COLUMNS} WHERE token = $1 AND is_revoked = FALSE AND expires_at > $2"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(RefreshToken::from))
    }

    #[instrument(skip(self, token, replaced_by_token))]
    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
        replaced_by_token: Option<&str>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $2, revoked_by_ip = $3, replaced_by_token = $4
            WHERE token = $1 AND is_revoked = FALSE
            ",
        )
        .bind(token)
        .bind(at)
        .bind(revoked_by_ip)
        .bind(replaced_by_token)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $2, revoked_by_ip = $3
            WHERE account_id = $1 AND is_revoked = FALSE AND expires_at > $2
            ",
        )
        .bind(account_id.into_inner())
        .bind(at)
        .bind(revoked_by_ip)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn list_active_for_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<RefreshToken>> {
        let rows = sqlx::query_as::<_, RefreshTokenModel>(&format!(
            "{SELECT_COLUMNS} WHERE account_id = $1 AND is_revoked = FALSE AND expires_at > $2 \
             ORDER BY issued_at DESC"
        ))
        .bind(account_id.into_inner())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(RefreshToken::from).collect())
    }

    #[instrument(skip(self))]
    async fn delete_expired_or_revoked(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM refresh_tokens
            WHERE is_revoked = TRUE OR expires_at <= $1
            ",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
