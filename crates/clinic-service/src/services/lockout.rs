//! Account lockout policy
//!
//! Counts consecutive failed logins and opens a lockout window when the
//! count reaches the threshold. The counter is left in place while locked;
//! a failure after the window has passed therefore relocks immediately, and
//! only a successful login clears it.

use clinic_core::{AccountId, LockoutState};
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Lockout guard over the account's counter columns
pub struct AccountLockoutGuard<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountLockoutGuard<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Whether a lockout window is in force right now
    #[instrument(skip(self))]
    pub async fn is_locked(&self, account_id: AccountId) -> ServiceResult<bool> {
        let state = self.ctx.lockout_repo().get_lockout_state(account_id).await?;
        Ok(state.is_locked_at(self.ctx.now()))
    }

    /// Record a failed password check
    #[instrument(skip(self))]
    pub async fn on_failed_attempt(&self, account_id: AccountId) -> ServiceResult<LockoutState> {
        let policy = self.ctx.policy();
        let lockout_until = self.ctx.now() + policy.lockout_duration;

        let state = self
            .ctx
            .lockout_repo()
            .record_failed_attempt(account_id, policy.max_failed_attempts, lockout_until)
            .await?;

        if state.failed_login_attempts >= policy.max_failed_attempts {
            warn!(
                %account_id,
                failed_attempts = state.failed_login_attempts,
                lockout_until = ?state.lockout_until,
                "Account locked after repeated failed logins"
            );
        } else {
            debug!(%account_id, failed_attempts = state.failed_login_attempts, "Failed login recorded");
        }

        Ok(state)
    }

    /// Clear the counter and any lockout window
    #[instrument(skip(self))]
    pub async fn on_success(&self, account_id: AccountId) -> ServiceResult<()> {
        self.ctx.lockout_repo().reset(account_id).await?;
        Ok(())
    }
}
