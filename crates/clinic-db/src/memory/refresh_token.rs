//! In-memory RefreshTokenRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};

use clinic_core::entities::RefreshToken;
use clinic_core::error::DomainError;
use clinic_core::traits::{RefreshTokenRepository, RepoResult};
use clinic_core::value_objects::AccountId;

/// Refresh tokens keyed by token value
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenRepository {
    tokens: DashMap<String, RefreshToken>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records in any state
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> RepoResult<()> {
        match self.tokens.entry(token.token.clone()) {
            Entry::Occupied(_) => Err(DomainError::DuplicateTokenValue),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(())
            }
        }
    }

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<RefreshToken>> {
        Ok(self.tokens.get(token).map(|entry| entry.value().clone()))
    }

    async fn find_active(&self, token: &str, now: DateTime<Utc>) -> RepoResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .get(token)
            .filter(|entry| entry.is_active_at(now))
            .map(|entry| entry.value().clone()))
    }

    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
        replaced_by_token: Option<&str>,
    ) -> RepoResult<bool> {
        Ok(self.tokens.get_mut(token).is_some_and(|mut entry| {
            entry.revoke(
                at,
                revoked_by_ip.map(str::to_owned),
                replaced_by_token.map(str::to_owned),
            )
        }))
    }

    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
    ) -> RepoResult<u64> {
        let mut revoked = 0;
        for mut entry in self.tokens.iter_mut() {
            if entry.account_id == account_id
                && entry.is_active_at(at)
                && entry.revoke(at, revoked_by_ip.map(str::to_owned), None)
            {
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn list_active_for_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<RefreshToken>> {
        let mut active: Vec<RefreshToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.account_id == account_id && entry.is_active_at(now))
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(active)
    }

    async fn delete_expired_or_revoked(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut deleted = 0;
        self.tokens.retain(|_, token| {
            let purge = token.is_purgeable_at(now);
            if purge {
                deleted += 1;
            }
            !purge
        });
        Ok(deleted)
    }
}
