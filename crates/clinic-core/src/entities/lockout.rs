//! Lockout state carried on the account row

use chrono::{DateTime, Utc};

/// Failed-attempt counter and lockout window of one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutState {
    pub failed_login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// A lockout is in force while `lockout_until` lies strictly in the future
    #[inline]
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }
}
