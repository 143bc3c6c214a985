//! Access token issuance and verification
//!
//! Access tokens are HS256 JWTs carrying a fixed, typed claim set. They are
//! never persisted: validity is signature + issuer/audience + expiry.
//! Expiry is enforced against the injected clock with zero leeway.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use clinic_core::{AccountId, SharedClock};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Access token claim set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account ID)
    pub sub: AccountId,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// Unique token id, keeps two tokens minted in the same second distinct
    pub jti: Uuid,
}

impl AccessClaims {
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        self.sub
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Outcome of verifying an access token
///
/// Every failure is a value; attacker-supplied input never produces an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerification {
    Valid(AccessClaims),
    Expired,
    Malformed,
    SignatureInvalid,
}

impl TokenVerification {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    #[must_use]
    pub fn into_claims(self) -> Option<AccessClaims> {
        match self {
            Self::Valid(claims) => Some(claims),
            _ => None,
        }
    }

    /// Collapse into the boundary error taxonomy (all failures are 401)
    pub fn into_result(self) -> Result<AccessClaims, AppError> {
        match self {
            Self::Valid(claims) => Ok(claims),
            Self::Expired => Err(AppError::TokenExpired),
            Self::Malformed | Self::SignatureInvalid => Err(AppError::InvalidToken),
        }
    }
}

/// A freshly signed access token
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Lifetime in seconds, as reported to clients
    pub expires_in: i64,
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_token_expiry: i64,
    clock: SharedClock,
}

impl TokenIssuer {
    /// Create a token issuer
    ///
    /// # Errors
    /// Returns `AppError::Config` if the secret is empty or the lifetime is not positive
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        access_token_expiry: i64,
        clock: SharedClock,
    ) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::Config("JWT signing secret is empty".to_string()));
        }
        if access_token_expiry <= 0 {
            return Err(AppError::Config(
                "Access token lifetime must be positive".to_string(),
            ));
        }

        let issuer = issuer.into();
        let audience = audience.into();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            audience,
            access_token_expiry,
            clock,
        })
    }

    /// Access token lifetime in seconds
    #[must_use]
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Sign a new access token for an account
    ///
    /// # Errors
    /// Returns `AppError::Internal` if encoding fails
    pub fn issue(
        &self,
        account_id: AccountId,
        roles: &BTreeSet<String>,
        tenant_id: Option<&str>,
    ) -> Result<IssuedAccessToken, AppError> {
        let now = self.clock.now();
        let expires_at = now + Duration::seconds(self.access_token_expiry);

        let claims = AccessClaims {
            sub: account_id,
            roles: roles.clone(),
            tenant_id: tenant_id.map(str::to_owned),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to encode JWT: {e}")))?;

        Ok(IssuedAccessToken {
            token,
            expires_at,
            expires_in: self.access_token_expiry,
        })
    }

    /// Verify signature, issuer, audience, and expiry
    pub fn verify(&self, token: &str) -> TokenVerification {
        let claims = match decode::<AccessClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidIssuer
                    | ErrorKind::InvalidAudience
                    | ErrorKind::InvalidAlgorithm => TokenVerification::SignatureInvalid,
                    ErrorKind::ExpiredSignature => TokenVerification::Expired,
                    _ => TokenVerification::Malformed,
                };
            }
        };

        if claims.exp <= self.clock.now().timestamp() {
            return TokenVerification::Expired;
        }

        TokenVerification::Valid(claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_expiry", &self.access_token_expiry)
            .finish_non_exhaustive()
    }
}
