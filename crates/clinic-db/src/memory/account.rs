//! In-memory identity store with lockout columns

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use clinic_core::entities::{AccountClaims, AccountRecord, LockoutState};
use clinic_core::error::DomainError;
use clinic_core::traits::{IdentityProvider, LockoutRepository, RepoResult};
use clinic_core::value_objects::AccountId;

#[derive(Debug, Clone)]
struct StoredAccount {
    record: AccountRecord,
    password_hash: String,
    claims: AccountClaims,
    lockout: LockoutState,
}

/// Accounts keyed by id
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, StoredAccount>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with a confirmed email
    ///
    /// # Errors
    /// Fails if the email or username is taken or the password cannot be hashed
    pub fn add_account(
        &self,
        email: &str,
        username: &str,
        password: &str,
        claims: AccountClaims,
    ) -> RepoResult<AccountId> {
        let taken = self.accounts.iter().any(|entry| {
            entry.record.email.eq_ignore_ascii_case(email) || entry.record.username == username
        });
        if taken {
            return Err(DomainError::ValidationError(format!(
                "account `{username}` already exists"
            )));
        }

        let password_hash = clinic_common::hash_password(password)
            .map_err(|e| DomainError::InternalError(e.to_string()))?;

        let id = AccountId::generate();
        self.accounts.insert(
            id,
            StoredAccount {
                record: AccountRecord {
                    id,
                    email: email.to_string(),
                    username: username.to_string(),
                    email_confirmed: true,
                },
                password_hash,
                claims,
                lockout: LockoutState::default(),
            },
        );
        Ok(id)
    }

    pub fn set_email_confirmed(&self, account_id: AccountId, confirmed: bool) -> RepoResult<()> {
        let mut account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(DomainError::AccountNotFound(account_id))?;
        account.record.email_confirmed = confirmed;
        Ok(())
    }

    /// Replace roles and tenant; picked up at the next token issuance
    pub fn set_claims(&self, account_id: AccountId, claims: AccountClaims) -> RepoResult<()> {
        let mut account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(DomainError::AccountNotFound(account_id))?;
        account.claims = claims;
        Ok(())
    }

    pub fn remove_account(&self, account_id: AccountId) -> bool {
        self.accounts.remove(&account_id).is_some()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<AccountRecord>> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.record.email.eq_ignore_ascii_case(email))
            .map(|entry| entry.record.clone()))
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<AccountRecord>> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.record.username == username)
            .map(|entry| entry.record.clone()))
    }

    async fn verify_password(&self, account_id: AccountId, password: &str) -> RepoResult<bool> {
        let Some(hash) = self
            .accounts
            .get(&account_id)
            .map(|entry| entry.password_hash.clone())
        else {
            return Ok(false);
        };

        let password = password.to_owned();
        tokio::task::spawn_blocking(move || clinic_common::verify_password(&password, &hash))
            .await
            .map_err(|e| DomainError::InternalError(format!("password check task failed: {e}")))?
            .map_err(|e| DomainError::InternalError(e.to_string()))
    }

    async fn verify_dummy_password(&self, password: &str) {
        let password = password.to_owned();
        let _ = tokio::task::spawn_blocking(move || clinic_common::verify_dummy_password(&password))
            .await;
    }

    async fn resolve_claims(&self, account_id: AccountId) -> RepoResult<Option<AccountClaims>> {
        Ok(self.accounts.get(&account_id).map(|entry| entry.claims.clone()))
    }
}

#[async_trait]
impl LockoutRepository for InMemoryAccountStore {
    async fn get_lockout_state(&self, account_id: AccountId) -> RepoResult<LockoutState> {
        self.accounts
            .get(&account_id)
            .map(|entry| entry.lockout)
            .ok_or(DomainError::AccountNotFound(account_id))
    }

    async fn record_failed_attempt(
        &self,
        account_id: AccountId,
        threshold: i32,
        lockout_until: DateTime<Utc>,
    ) -> RepoResult<LockoutState> {
        let mut account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(DomainError::AccountNotFound(account_id))?;

        account.lockout.failed_login_attempts += 1;
        if account.lockout.failed_login_attempts >= threshold {
            account.lockout.lockout_until = Some(lockout_until);
        }
        Ok(account.lockout)
    }

    async fn reset(&self, account_id: AccountId) -> RepoResult<()> {
        let mut account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(DomainError::AccountNotFound(account_id))?;
        account.lockout = LockoutState::default();
        Ok(())
    }
}
