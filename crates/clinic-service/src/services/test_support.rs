//! Shared fixtures for service tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_common::TokenIssuer;
use clinic_core::traits::{RefreshTokenRepository, RepoResult};
use clinic_core::{AccountClaims, AccountId, ManualClock, RefreshToken};
use clinic_db::{InMemoryAccountStore, InMemoryRefreshTokenRepository};
use tokio::sync::oneshot;

use super::context::{ServiceContext, ServiceContextBuilder, SessionPolicy};

pub const ALICE_EMAIL: &str = "alice@clinic.test";
pub const ALICE_PASSWORD: &str = "correct horse battery";

pub struct TestHarness {
    pub ctx: ServiceContext,
    pub clock: Arc<ManualClock>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub refresh_tokens: Arc<GatedRefreshTokenRepository>,
    pub alice: AccountId,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_policy(|_| {})
    }

    pub fn with_policy(adjust: impl FnOnce(&mut SessionPolicy)) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let alice = accounts
            .add_account(
                ALICE_EMAIL,
                "alice",
                ALICE_PASSWORD,
                AccountClaims::new(["Doctor"], Some("tenant-1".to_string())),
            )
            .unwrap();

        let issuer = TokenIssuer::new("test-secret", "clinic-auth", "clinic-api", 900, clock.clone())
            .unwrap();

        let mut policy = SessionPolicy::default();
        adjust(&mut policy);

        let refresh_tokens = Arc::new(GatedRefreshTokenRepository::default());
        let ctx = ServiceContextBuilder::new()
            .refresh_token_repo(refresh_tokens.clone())
            .lockout_repo(accounts.clone())
            .identity(accounts.clone())
            .token_issuer(Arc::new(issuer))
            .clock(clock.clone())
            .policy(policy)
            .build()
            .unwrap();

        Self {
            ctx,
            clock,
            accounts,
            refresh_tokens,
            alice,
        }
    }

    pub fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        use clinic_core::Clock;
        self.clock.now()
    }
}

/// Repository call a [`GatedRefreshTokenRepository`] can hold open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePoint {
    /// Before the record is written
    Insert,
    /// After the record for this token value has been read
    FindByToken(String),
}

/// Handles for one armed gate
pub struct Gate {
    /// Fires once a call has reached the gate
    pub reached: oneshot::Receiver<()>,
    /// Send (or drop) to let the held call continue
    pub release: oneshot::Sender<()>,
}

struct ArmedGate {
    point: GatePoint,
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// In-memory repository that can pause one call at a chosen point
#[derive(Default)]
pub struct GatedRefreshTokenRepository {
    inner: InMemoryRefreshTokenRepository,
    armed: Mutex<Option<ArmedGate>>,
}

impl GatedRefreshTokenRepository {
    /// Hold the next call matching `point` until released
    pub fn arm(&self, point: GatePoint) -> Gate {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.armed.lock().unwrap() = Some(ArmedGate {
            point,
            reached: reached_tx,
            release: release_rx,
        });
        Gate {
            reached: reached_rx,
            release: release_tx,
        }
    }

    async fn pass(&self, point: GatePoint) {
        let gate = {
            let mut armed = self.armed.lock().unwrap();
            match armed.as_ref() {
                Some(gate) if gate.point == point => armed.take(),
                _ => None,
            }
        };
        if let Some(gate) = gate {
            let _ = gate.reached.send(());
            let _ = gate.release.await;
        }
    }
}

#[async_trait]
impl RefreshTokenRepository for GatedRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> RepoResult<()> {
        self.pass(GatePoint::Insert).await;
        self.inner.insert(token).await
    }

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<RefreshToken>> {
        let record = self.inner.find_by_token(token).await;
        self.pass(GatePoint::FindByToken(token.to_owned())).await;
        record
    }

    async fn find_active(&self, token: &str, now: DateTime<Utc>) -> RepoResult<Option<RefreshToken>> {
        self.inner.find_active(token, now).await
    }

    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
        replaced_by_token: Option<&str>,
    ) -> RepoResult<bool> {
        self.inner.revoke(token, at, revoked_by_ip, replaced_by_token).await
    }

    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        at: DateTime<Utc>,
        revoked_by_ip: Option<&str>,
    ) -> RepoResult<u64> {
        self.inner.revoke_all_for_account(account_id, at, revoked_by_ip).await
    }

    async fn list_active_for_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<RefreshToken>> {
        self.inner.list_active_for_account(account_id, now).await
    }

    async fn delete_expired_or_revoked(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        self.inner.delete_expired_or_revoked(now).await
    }
}
