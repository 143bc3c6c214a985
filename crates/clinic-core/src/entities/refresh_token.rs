//! Refresh token entity - one persisted, opaque, rotating credential

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use uuid::Uuid;

use crate::value_objects::AccountId;

/// Number of random bytes behind every refresh token value (256 bits)
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Persisted refresh token record
///
/// Records form rotation chains through `replaced_by_token`: when a token is
/// exchanged, the old record is revoked and points at its successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    /// The credential itself; unique across all records
    pub token: String,
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_by_ip: Option<String>,
    pub revoked_by_ip: Option<String>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub replaced_by_token: Option<String>,
}

impl RefreshToken {
    /// Create a new active token with a freshly generated value
    pub fn issue(
        account_id: AccountId,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
        created_by_ip: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: generate_refresh_token_value(),
            account_id,
            issued_at,
            expires_at: issued_at + lifetime,
            created_by_ip,
            revoked_by_ip: None,
            is_revoked: false,
            revoked_at: None,
            replaced_by_token: None,
        }
    }

    /// Active means not revoked and not yet at its expiry instant
    #[inline]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expires_at > now
    }

    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Eligible for the cleanup sweep
    #[inline]
    pub fn is_purgeable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_revoked || self.is_expired_at(now)
    }

    /// Revoked as part of a rotation (as opposed to logout or revoke-all)
    #[inline]
    pub fn was_rotated(&self) -> bool {
        self.is_revoked && self.replaced_by_token.is_some()
    }

    /// Mark the token revoked
    ///
    /// Returns `false` without touching anything when the token was already
    /// revoked, so the first revocation's provenance is preserved.
    pub fn revoke(
        &mut self,
        at: DateTime<Utc>,
        revoked_by_ip: Option<String>,
        replaced_by_token: Option<String>,
    ) -> bool {
        if self.is_revoked {
            return false;
        }

        self.is_revoked = true;
        self.revoked_at = Some(at);
        self.revoked_by_ip = revoked_by_ip;
        self.replaced_by_token = replaced_by_token;
        true
    }

    /// Remaining lifetime in whole seconds (zero once expired)
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Generate a cryptographically secure random refresh token value
///
/// 32 bytes from the OS RNG, URL-safe base64 without padding (43 chars).
pub fn generate_refresh_token_value() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
