//! Refresh token store
//!
//! The only mutation path for refresh-token records. Every lifetime decision
//! reads the injected clock.

use std::collections::HashSet;

use clinic_core::{AccountId, RefreshToken};
use tracing::{debug, info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Refresh token store
pub struct RefreshTokenStore<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RefreshTokenStore<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Mint and persist a new active token for the account
    #[instrument(skip(self))]
    pub async fn issue(
        &self,
        account_id: AccountId,
        source_ip: Option<&str>,
    ) -> ServiceResult<RefreshToken> {
        let token = RefreshToken::issue(
            account_id,
            self.ctx.now(),
            self.ctx.policy().refresh_token_lifetime,
            source_ip.map(str::to_owned),
        );
        self.ctx.refresh_token_repo().insert(&token).await?;

        debug!(%account_id, token_id = %token.id, expires_at = %token.expires_at, "Issued refresh token");
        Ok(token)
    }

    /// The record, only if it is active now
    #[instrument(skip_all)]
    pub async fn get_active(&self, token: &str) -> ServiceResult<Option<RefreshToken>> {
        Ok(self
            .ctx
            .refresh_token_repo()
            .find_active(token, self.ctx.now())
            .await?)
    }

    /// The record in any state
    #[instrument(skip_all)]
    pub async fn find(&self, token: &str) -> ServiceResult<Option<RefreshToken>> {
        Ok(self.ctx.refresh_token_repo().find_by_token(token).await?)
    }

    /// Revoke a token; unknown or already revoked tokens are left untouched
    ///
    /// Returns whether this call performed the revocation.
    #[instrument(skip(self, token, replaced_by))]
    pub async fn revoke(
        &self,
        token: &str,
        source_ip: Option<&str>,
        replaced_by: Option<&str>,
    ) -> ServiceResult<bool> {
        Ok(self
            .ctx
            .refresh_token_repo()
            .revoke(token, self.ctx.now(), source_ip, replaced_by)
            .await?)
    }

    /// Revoke every active token of the account
    #[instrument(skip(self))]
    pub async fn revoke_all(
        &self,
        account_id: AccountId,
        source_ip: Option<&str>,
    ) -> ServiceResult<u64> {
        let revoked = self
            .ctx
            .refresh_token_repo()
            .revoke_all_for_account(account_id, self.ctx.now(), source_ip)
            .await?;

        info!(%account_id, revoked, "Revoked all refresh tokens for account");
        Ok(revoked)
    }

    /// Walk `replaced_by_token` from `token` and revoke everything still active
    ///
    /// The starting token is included. Returns the number of records revoked.
    #[instrument(skip(self, token))]
    pub async fn revoke_chain_from(
        &self,
        token: &str,
        source_ip: Option<&str>,
    ) -> ServiceResult<u64> {
        let mut revoked = 0;
        let mut seen = HashSet::new();
        let mut next = Some(token.to_owned());

        while let Some(current) = next.take() {
            if !seen.insert(current.clone()) {
                break;
            }
            let Some(mut record) = self.find(&current).await? else {
                break;
            };
            if record.is_active_at(self.ctx.now()) {
                if self.revoke(&current, source_ip, None).await? {
                    revoked += 1;
                } else if let Some(fresh) = self.find(&current).await? {
                    // Rotated after our read; follow the new successor
                    record = fresh;
                }
            }
            next = record.replaced_by_token;
        }

        Ok(revoked)
    }

    /// Active tokens of the account, newest first
    #[instrument(skip(self))]
    pub async fn list_active(&self, account_id: AccountId) -> ServiceResult<Vec<RefreshToken>> {
        Ok(self
            .ctx
            .refresh_token_repo()
            .list_active_for_account(account_id, self.ctx.now())
            .await?)
    }

    /// Delete revoked and expired records; active records are never touched
    #[instrument(skip(self))]
    pub async fn purge_expired_or_revoked(&self) -> ServiceResult<u64> {
        Ok(self
            .ctx
            .refresh_token_repo()
            .delete_expired_or_revoked(self.ctx.now())
            .await?)
    }
}
