//! Session orchestrator
//!
//! Login, refresh (rotation), logout, and revoke-all. Every client-visible
//! failure collapses into one indistinguishable error per flow; the reason is
//! only recorded in the server log.

use chrono::{DateTime, Utc};
use clinic_core::{AccountClaims, AccountId, AccountRecord, RefreshToken};
use tracing::{debug, error, info, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::lockout::AccountLockoutGuard;
use super::refresh_token::RefreshTokenStore;

/// Access/refresh pair handed to the delivery layer
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub account_id: AccountId,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    /// Seconds until the refresh token expires, for cookie `Max-Age`
    pub refresh_token_max_age: i64,
    /// Known on login only
    pub email_confirmed: Option<bool>,
}

/// Session orchestrator
pub struct SessionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SessionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn store(&self) -> RefreshTokenStore<'a> {
        RefreshTokenStore::new(self.ctx)
    }

    fn lockout(&self) -> AccountLockoutGuard<'a> {
        AccountLockoutGuard::new(self.ctx)
    }

    /// Authenticate with email or username plus password
    ///
    /// An email match wins over a username match. Unconfirmed email does not
    /// block login.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        client_ip: Option<&str>,
    ) -> ServiceResult<SessionTokens> {
        let identifier = identifier.trim();

        let Some(account) = self.resolve_account(identifier).await? else {
            self.ctx.identity().verify_dummy_password(password).await;
            warn!(reason = "unknown_identifier", "Login failed");
            return Err(ServiceError::invalid_credentials());
        };
        let account_id = account.id;

        if self.lockout().is_locked(account_id).await? {
            self.ctx.identity().verify_dummy_password(password).await;
            warn!(%account_id, reason = "locked", "Login failed");
            return Err(ServiceError::invalid_credentials());
        }

        if !self.ctx.identity().verify_password(account_id, password).await? {
            let state = self.lockout().on_failed_attempt(account_id).await?;
            warn!(
                %account_id,
                reason = "bad_password",
                failed_attempts = state.failed_login_attempts,
                "Login failed"
            );
            return Err(ServiceError::invalid_credentials());
        }

        self.lockout().on_success(account_id).await?;

        let Some(claims) = self.ctx.identity().resolve_claims(account_id).await? else {
            warn!(%account_id, reason = "account_vanished", "Login failed");
            return Err(ServiceError::invalid_credentials());
        };

        let refresh = self.store().issue(account_id, client_ip).await?;
        let tokens = self.assemble(account_id, &claims, refresh, Some(account.email_confirmed))?;

        info!(%account_id, email_confirmed = account.email_confirmed, "Login succeeded");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The presented token is consumed: it ends up revoked with
    /// `replaced_by_token` pointing at its single successor.
    #[instrument(skip(self, presented))]
    pub async fn refresh(&self, presented: &str, client_ip: Option<&str>) -> ServiceResult<SessionTokens> {
        let store = self.store();

        let Some(current) = store.get_active(presented).await? else {
            self.handle_inactive(presented, client_ip).await?;
            return Err(ServiceError::unauthorized());
        };
        let account_id = current.account_id;

        let _lock = self.ctx.account_locks().acquire(account_id).await;

        // Another request may have rotated it while we waited
        if store.get_active(presented).await?.is_none() {
            debug!(%account_id, reason = "rotated_concurrently", "Refresh rejected");
            return Err(ServiceError::unauthorized());
        }

        let Some(claims) = self.ctx.identity().resolve_claims(account_id).await? else {
            store.revoke(presented, client_ip, None).await?;
            warn!(%account_id, reason = "account_vanished", "Refresh rejected");
            return Err(ServiceError::unauthorized());
        };

        let successor = store.issue(account_id, client_ip).await?;
        if !store
            .revoke(presented, client_ip, Some(&successor.token))
            .await?
        {
            // Lost to another process between the re-check and the revoke
            store.revoke(&successor.token, client_ip, None).await?;
            warn!(%account_id, reason = "lost_revoke_race", "Refresh rejected");
            return Err(ServiceError::unauthorized());
        }

        let tokens = self.assemble(account_id, &claims, successor, None)?;

        info!(%account_id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Revoke the presented refresh token, if any
    ///
    /// Never fails: unknown tokens are a no-op and store faults are logged.
    #[instrument(skip(self, presented))]
    pub async fn logout(&self, presented: Option<&str>, client_ip: Option<&str>) {
        let Some(token) = presented.filter(|t| !t.is_empty()) else {
            debug!("Logout without refresh token");
            return;
        };

        match self.store().revoke(token, client_ip, None).await {
            Ok(true) => info!("Refresh token revoked on logout"),
            Ok(false) => debug!("Logout for unknown or already revoked token"),
            Err(e) => error!(error = %e, "Failed to revoke refresh token on logout"),
        }
    }

    /// Revoke every active refresh token of the account
    #[instrument(skip(self))]
    pub async fn logout_everywhere(
        &self,
        account_id: AccountId,
        client_ip: Option<&str>,
    ) -> ServiceResult<u64> {
        self.store().revoke_all(account_id, client_ip).await
    }

    /// Active refresh tokens of the account, newest first
    #[instrument(skip(self))]
    pub async fn active_sessions(&self, account_id: AccountId) -> ServiceResult<Vec<RefreshToken>> {
        self.store().list_active(account_id).await
    }

    async fn resolve_account(&self, identifier: &str) -> ServiceResult<Option<AccountRecord>> {
        if identifier.is_empty() {
            return Ok(None);
        }
        if let Some(account) = self.ctx.identity().find_by_email(identifier).await? {
            return Ok(Some(account));
        }
        Ok(self.ctx.identity().find_by_username(identifier).await?)
    }

    /// Inspect a token that failed the active lookup for signs of replay
    ///
    /// A rotated parent presented after the reuse grace means a copy of the
    /// chain is in someone else's hands; the whole forward chain is revoked.
    async fn handle_inactive(&self, presented: &str, client_ip: Option<&str>) -> ServiceResult<()> {
        let store = self.store();

        let Some(record) = store.find(presented).await? else {
            debug!(reason = "unknown_token", "Refresh rejected");
            return Ok(());
        };
        let account_id = record.account_id;

        if !record.was_rotated() {
            debug!(%account_id, reason = "revoked_or_expired", "Refresh rejected");
            return Ok(());
        }

        let policy = self.ctx.policy();
        let revoked_at = record.revoked_at.unwrap_or(record.issued_at);
        if self.ctx.now() - revoked_at <= policy.reuse_grace {
            debug!(%account_id, reason = "within_reuse_grace", "Refresh rejected");
            return Ok(());
        }

        if !policy.revoke_chain_on_replay {
            warn!(%account_id, reason = "replay", "Refresh rejected");
            return Ok(());
        }

        // Serialize with rotation so the walk sees the current chain tip
        let _lock = self.ctx.account_locks().acquire(account_id).await;
        let revoked = store.revoke_chain_from(presented, client_ip).await?;
        warn!(%account_id, revoked, reason = "replay", "Rotated refresh token replayed; chain revoked");
        Ok(())
    }

    fn assemble(
        &self,
        account_id: AccountId,
        claims: &AccountClaims,
        refresh: RefreshToken,
        email_confirmed: Option<bool>,
    ) -> ServiceResult<SessionTokens> {
        let access = self
            .ctx
            .token_issuer()
            .issue(account_id, &claims.roles, claims.tenant_id.as_deref())?;

        Ok(SessionTokens {
            account_id,
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            expires_in: access.expires_in,
            // Freshly issued, so the full lifetime remains
            refresh_token_max_age: refresh.remaining_seconds(refresh.issued_at),
            refresh_token_expires_at: refresh.expires_at,
            refresh_token: refresh.token,
            email_confirmed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{GatePoint, TestHarness, ALICE_EMAIL, ALICE_PASSWORD};
    use chrono::Duration;
    use clinic_common::{AppError, TokenVerification};

    fn assert_invalid_credentials(result: ServiceResult<SessionTokens>) {
        assert!(matches!(
            result,
            Err(ServiceError::App(AppError::InvalidCredentials))
        ));
    }

    fn assert_unauthorized(result: ServiceResult<SessionTokens>) {
        assert!(matches!(result, Err(ServiceError::App(AppError::Unauthorized))));
    }

    #[tokio::test]
    async fn test_login_by_email_and_username() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);

        let by_email = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, Some("10.0.0.1")).await.unwrap();
        assert_eq!(by_email.account_id, h.alice);
        assert_eq!(by_email.email_confirmed, Some(true));
        assert_eq!(by_email.expires_in, 900);
        assert_eq!(by_email.refresh_token_max_age, Duration::days(7).num_seconds());

        let by_username = sessions.login("alice", ALICE_PASSWORD, None).await.unwrap();
        assert_eq!(by_username.account_id, h.alice);
        assert_ne!(by_email.refresh_token, by_username.refresh_token);
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_access_token() {
        let h = TestHarness::new();
        let tokens = SessionService::new(&h.ctx)
            .login(ALICE_EMAIL, ALICE_PASSWORD, None)
            .await
            .unwrap();

        let TokenVerification::Valid(claims) = h.ctx.token_issuer().verify(&tokens.access_token) else {
            panic!("access token should verify");
        };
        assert_eq!(claims.sub, h.alice);
        assert!(claims.roles.contains("Doctor"));
        assert_eq!(claims.tenant_id.as_deref(), Some("tenant-1"));
    }

    #[tokio::test]
    async fn test_email_precedence_over_username() {
        let h = TestHarness::new();
        // Username of the second account equals Alice's email
        let impostor = h
            .accounts
            .add_account("mallory@clinic.test", ALICE_EMAIL, "mallory-pw", AccountClaims::default())
            .unwrap();

        let tokens = SessionService::new(&h.ctx)
            .login(ALICE_EMAIL, ALICE_PASSWORD, None)
            .await
            .unwrap();
        assert_eq!(tokens.account_id, h.alice);
        assert_ne!(tokens.account_id, impostor);
    }

    #[tokio::test]
    async fn test_unconfirmed_email_still_logs_in() {
        let h = TestHarness::new();
        h.accounts.set_email_confirmed(h.alice, false).unwrap();

        let tokens = SessionService::new(&h.ctx)
            .login(ALICE_EMAIL, ALICE_PASSWORD, None)
            .await
            .unwrap();
        assert_eq!(tokens.email_confirmed, Some(false));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);

        assert_invalid_credentials(sessions.login("nobody@clinic.test", "x", None).await);
        assert_invalid_credentials(sessions.login(ALICE_EMAIL, "wrong", None).await);
        assert_invalid_credentials(sessions.login("", ALICE_PASSWORD, None).await);
    }

    #[tokio::test]
    async fn test_lockout_threshold_and_recovery() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);

        for _ in 0..5 {
            assert_invalid_credentials(sessions.login(ALICE_EMAIL, "wrong", None).await);
        }

        // Correct password while locked
        assert_invalid_credentials(sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await);

        h.clock.advance(Duration::minutes(30) + Duration::seconds(1));
        sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        let state = h.ctx.lockout_repo().get_lockout_state(h.alice).await.unwrap();
        assert_eq!(state.failed_login_attempts, 0);
        assert!(state.lockout_until.is_none());
    }

    #[tokio::test]
    async fn test_login_recovers_when_counter_above_threshold() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);

        for _ in 0..5 {
            assert_invalid_credentials(sessions.login(ALICE_EMAIL, "wrong", None).await);
        }
        h.clock.advance(Duration::minutes(31));

        // One more miss after the window relocks straight away
        assert_invalid_credentials(sessions.login(ALICE_EMAIL, "wrong", None).await);
        let state = h.ctx.lockout_repo().get_lockout_state(h.alice).await.unwrap();
        assert_eq!(state.failed_login_attempts, 6);
        assert_invalid_credentials(sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await);

        h.clock.advance(Duration::minutes(31));
        sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        let state = h.ctx.lockout_repo().get_lockout_state(h.alice).await.unwrap();
        assert_eq!(state.failed_login_attempts, 0);
        assert!(state.lockout_until.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_single_use() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        let rotated = sessions.refresh(&login.refresh_token, Some("10.0.0.9")).await.unwrap();
        assert_ne!(rotated.refresh_token, login.refresh_token);
        assert_eq!(rotated.account_id, h.alice);
        assert!(rotated.email_confirmed.is_none());

        assert_unauthorized(sessions.refresh(&login.refresh_token, None).await);
    }

    #[tokio::test]
    async fn test_rotation_chain_integrity() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        let rotated = sessions.refresh(&login.refresh_token, Some("10.0.0.9")).await.unwrap();

        let store = RefreshTokenStore::new(&h.ctx);
        let parent = store.find(&login.refresh_token).await.unwrap().unwrap();
        assert!(parent.is_revoked);
        assert!(parent.revoked_at.is_some());
        assert_eq!(parent.revoked_by_ip.as_deref(), Some("10.0.0.9"));
        assert_eq!(parent.replaced_by_token.as_deref(), Some(rotated.refresh_token.as_str()));

        let child = store.get_active(&rotated.refresh_token).await.unwrap().unwrap();
        assert_eq!(child.account_id, parent.account_id);
    }

    #[tokio::test]
    async fn test_refresh_rejects_unknown_and_expired() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);

        assert_unauthorized(sessions.refresh("not-a-token", None).await);

        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        h.clock.set(login.refresh_token_expires_at);
        assert_unauthorized(sessions.refresh(&login.refresh_token, None).await);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_changes() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        h.accounts
            .set_claims(h.alice, AccountClaims::new(["ClinicAdmin"], Some("tenant-2".to_string())))
            .unwrap();
        let rotated = sessions.refresh(&login.refresh_token, None).await.unwrap();

        let claims = h.ctx.token_issuer().verify(&rotated.access_token).into_claims().unwrap();
        assert!(claims.roles.contains("ClinicAdmin"));
        assert!(!claims.roles.contains("Doctor"));
        assert_eq!(claims.tenant_id.as_deref(), Some("tenant-2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_has_one_winner() {
        let h = TestHarness::new();
        let login = SessionService::new(&h.ctx)
            .login(ALICE_EMAIL, ALICE_PASSWORD, None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let ctx = h.ctx.clone();
            let token = login.refresh_token.clone();
            handles.push(tokio::spawn(async move {
                SessionService::new(&ctx).refresh(&token, None).await
            }));
        }

        let mut successes = 0;
        let mut rejections = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ServiceError::App(AppError::Unauthorized)) => rejections += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((successes, rejections), (1, 1));

        let active = RefreshTokenStore::new(&h.ctx).list_active(h.alice).await.unwrap();
        assert_eq!(active.len(), 1);
        assert!(h.ctx.account_locks().is_empty());
    }

    #[tokio::test]
    async fn test_replay_within_grace_keeps_winner() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        let winner = sessions.refresh(&login.refresh_token, None).await.unwrap();

        h.clock.advance(Duration::seconds(2));
        assert_unauthorized(sessions.refresh(&login.refresh_token, None).await);

        sessions.refresh(&winner.refresh_token, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_replay_after_grace_revokes_chain() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        let second = sessions.refresh(&login.refresh_token, None).await.unwrap();
        let third = sessions.refresh(&second.refresh_token, None).await.unwrap();

        h.clock.advance(Duration::minutes(1));
        assert_unauthorized(sessions.refresh(&login.refresh_token, Some("203.0.113.7")).await);
        assert_unauthorized(sessions.refresh(&third.refresh_token, None).await);

        let store = RefreshTokenStore::new(&h.ctx);
        let third = store.find(&third.refresh_token).await.unwrap().unwrap();
        assert_eq!(third.revoked_by_ip.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_replay_cascade_can_be_disabled() {
        let h = TestHarness::with_policy(|p| p.revoke_chain_on_replay = false);
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        let winner = sessions.refresh(&login.refresh_token, None).await.unwrap();

        h.clock.advance(Duration::minutes(1));
        assert_unauthorized(sessions.refresh(&login.refresh_token, None).await);
        sessions.refresh(&winner.refresh_token, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_replay_cascade_waits_for_inflight_rotation() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        let second = sessions.refresh(&login.refresh_token, None).await.unwrap();
        h.clock.advance(Duration::minutes(1));

        // Hold the cascade after it has read the still-active child
        let gate = h
            .refresh_tokens
            .arm(GatePoint::FindByToken(second.refresh_token.clone()));
        let replay = {
            let ctx = h.ctx.clone();
            let token = login.refresh_token.clone();
            tokio::spawn(async move { SessionService::new(&ctx).refresh(&token, None).await })
        };
        gate.reached.await.unwrap();

        let rotation = {
            let ctx = h.ctx.clone();
            let token = second.refresh_token.clone();
            tokio::spawn(async move { SessionService::new(&ctx).refresh(&token, None).await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.release.send(()).unwrap();

        assert_unauthorized(replay.await.unwrap());
        assert_unauthorized(rotation.await.unwrap());
        assert!(sessions.active_sessions(h.alice).await.unwrap().is_empty());
        assert!(h.ctx.account_locks().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_refresh_releases_account_lock() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        // Stall the successor write while the lock is held
        let gate = h.refresh_tokens.arm(GatePoint::Insert);
        let stalled = {
            let ctx = h.ctx.clone();
            let token = login.refresh_token.clone();
            tokio::spawn(async move { SessionService::new(&ctx).refresh(&token, None).await })
        };
        gate.reached.await.unwrap();
        assert_eq!(h.ctx.account_locks().len(), 1);

        stalled.abort();
        assert!(stalled.await.unwrap_err().is_cancelled());
        drop(gate.release);

        assert!(h.ctx.account_locks().is_empty());
        let rotated = sessions.refresh(&login.refresh_token, None).await.unwrap();
        assert_ne!(rotated.refresh_token, login.refresh_token);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let login = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        sessions.logout(Some(&login.refresh_token), None).await;
        sessions.logout(Some(&login.refresh_token), None).await;
        sessions.logout(Some("garbage"), None).await;
        sessions.logout(None, None).await;

        assert_unauthorized(sessions.refresh(&login.refresh_token, None).await);
    }

    #[tokio::test]
    async fn test_logout_only_revokes_target() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let phone = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        let laptop = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        sessions.logout(Some(&phone.refresh_token), None).await;
        sessions.refresh(&laptop.refresh_token, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_everywhere() {
        let h = TestHarness::new();
        let sessions = SessionService::new(&h.ctx);
        let a = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();
        let b = sessions.login(ALICE_EMAIL, ALICE_PASSWORD, None).await.unwrap();

        assert_eq!(sessions.active_sessions(h.alice).await.unwrap().len(), 2);
        assert_eq!(sessions.logout_everywhere(h.alice, None).await.unwrap(), 2);
        assert_unauthorized(sessions.refresh(&a.refresh_token, None).await);
        assert_unauthorized(sessions.refresh(&b.refresh_token, None).await);
    }

    #[tokio::test]
    async fn test_access_token_expires_with_clock() {
        let h = TestHarness::new();
        let tokens = SessionService::new(&h.ctx)
            .login(ALICE_EMAIL, ALICE_PASSWORD, None)
            .await
            .unwrap();

        h.clock.advance(Duration::seconds(tokens.expires_in));
        assert_eq!(
            h.ctx.token_issuer().verify(&tokens.access_token),
            TokenVerification::Expired
        );
    }
}
