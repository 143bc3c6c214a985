//! Authentication extractor
//!
//! Extracts and verifies the access token from the Authorization header.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use clinic_common::{AccessClaims, AppError};
use clinic_core::AccountId;

use crate::response::ApiError;
use crate::state::AppState;

/// Caller authenticated by a valid access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: AccountId,
    pub claims: AccessClaims,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::App(AppError::MissingAuth))?;

        let app_state = AppState::from_ref(state);

        let claims = app_state
            .token_issuer()
            .verify(bearer.token())
            .into_result()
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                ApiError::App(e)
            })?;

        Ok(Self {
            account_id: claims.account_id(),
            claims,
        })
    }
}
