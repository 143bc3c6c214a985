//! Service context - dependency container for services
//!
//! Holds the storage ports, the token issuer, the clock, the per-account lock
//! registry, and the session policy.

use std::sync::Arc;

use chrono::Duration;
use clinic_common::{AppConfig, TokenIssuer};
use clinic_core::traits::{IdentityProvider, LockoutRepository, RefreshTokenRepository};
use clinic_core::{SharedClock, SystemClock};
use clinic_db::PgPool;

use super::concurrency::AccountLockRegistry;
use super::error::{ServiceError, ServiceResult};

/// Lifetimes and thresholds governing sessions
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub refresh_token_lifetime: Duration,
    /// Re-presenting a rotated parent within this window counts as a lost race
    pub reuse_grace: Duration,
    pub revoke_chain_on_replay: bool,
    pub max_failed_attempts: i32,
    pub lockout_duration: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            refresh_token_lifetime: Duration::days(7),
            reuse_grace: Duration::seconds(5),
            revoke_chain_on_replay: true,
            max_failed_attempts: 5,
            lockout_duration: Duration::minutes(30),
        }
    }
}

impl SessionPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            refresh_token_lifetime: config.refresh.lifetime(),
            reuse_grace: config.refresh.reuse_grace(),
            revoke_chain_on_replay: config.refresh.revoke_chain_on_replay,
            max_failed_attempts: config.lockout.max_failed_attempts,
            lockout_duration: config.lockout.lockout_duration(),
        }
    }
}

/// Service context containing all dependencies
///
/// Cloning is cheap; every clone shares the same repositories and lock registry.
#[derive(Clone)]
pub struct ServiceContext {
    // Database pool, absent for the in-memory backend
    pool: Option<PgPool>,

    // Ports
    refresh_token_repo: Arc<dyn RefreshTokenRepository>,
    lockout_repo: Arc<dyn LockoutRepository>,
    identity: Arc<dyn IdentityProvider>,

    token_issuer: Arc<TokenIssuer>,
    clock: SharedClock,
    account_locks: Arc<AccountLockRegistry>,
    policy: SessionPolicy,
}

impl ServiceContext {
    // === Database Pool ===

    /// PostgreSQL pool when running on the Postgres backend
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    // === Ports ===

    pub fn refresh_token_repo(&self) -> &dyn RefreshTokenRepository {
        self.refresh_token_repo.as_ref()
    }

    pub fn lockout_repo(&self) -> &dyn LockoutRepository {
        self.lockout_repo.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    // === Services ===

    pub fn token_issuer(&self) -> &TokenIssuer {
        self.token_issuer.as_ref()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Current instant according to the injected clock
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn account_locks(&self) -> &AccountLockRegistry {
        self.account_locks.as_ref()
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("pool", &self.pool.as_ref().map(|_| "PgPool"))
            .field("repositories", &"...")
            .field("token_issuer", &self.token_issuer)
            .field("clock", &self.clock)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Builder for creating ServiceContext
#[derive(Default)]
pub struct ServiceContextBuilder {
    pool: Option<PgPool>,
    refresh_token_repo: Option<Arc<dyn RefreshTokenRepository>>,
    lockout_repo: Option<Arc<dyn LockoutRepository>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    token_issuer: Option<Arc<TokenIssuer>>,
    clock: Option<SharedClock>,
    account_locks: Option<Arc<AccountLockRegistry>>,
    policy: Option<SessionPolicy>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn refresh_token_repo(mut self, repo: Arc<dyn RefreshTokenRepository>) -> Self {
        self.refresh_token_repo = Some(repo);
        self
    }

    pub fn lockout_repo(mut self, repo: Arc<dyn LockoutRepository>) -> Self {
        self.lockout_repo = Some(repo);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn token_issuer(mut self, issuer: Arc<TokenIssuer>) -> Self {
        self.token_issuer = Some(issuer);
        self
    }

    /// Defaults to the system clock
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn account_locks(mut self, registry: Arc<AccountLockRegistry>) -> Self {
        self.account_locks = Some(registry);
        self
    }

    pub fn policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            pool: self.pool,
            refresh_token_repo: self
                .refresh_token_repo
                .ok_or_else(|| ServiceError::validation("refresh_token_repo is required"))?,
            lockout_repo: self
                .lockout_repo
                .ok_or_else(|| ServiceError::validation("lockout_repo is required"))?,
            identity: self
                .identity
                .ok_or_else(|| ServiceError::validation("identity is required"))?,
            token_issuer: self
                .token_issuer
                .ok_or_else(|| ServiceError::validation("token_issuer is required"))?,
            clock: self.clock.unwrap_or_else(SystemClock::shared),
            account_locks: self.account_locks.unwrap_or_default(),
            policy: self.policy.unwrap_or_default(),
        })
    }
}
