//! Authentication handlers
//!
//! Login, refresh, logout, and session endpoints. Failures on the login and
//! refresh paths never reveal why they failed.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use clinic_common::AppError;
use clinic_service::dto::{
    CurrentAccountResponse, LoginRequest, LogoutAllResponse, LogoutRequest, MessageResponse,
    RefreshTokenRequest, SessionResponse, TokenResponse,
};
use clinic_service::SessionService;

use crate::delivery::ClientKind;
use crate::extractors::{AuthUser, ClientIp, ValidatedJson};
use crate::response::{ApiError, ApiResult};
use crate::state::AppState;

/// Login with email or username and password
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    kind: ClientKind,
    ip: ClientIp,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<TokenResponse>)> {
    let tokens = SessionService::new(state.service_context())
        .login(&request.identifier, &request.password, ip.as_deref())
        .await?;

    Ok(state.delivery().deliver(kind, jar, tokens))
}

/// Exchange the refresh token for a new pair
///
/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    kind: ClientKind,
    ip: ClientIp,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> Response {
    let delivery = state.delivery();
    let body_token = body.and_then(|Json(b)| b.refresh_token);

    let Some(presented) = delivery.presented_token(kind, &jar, body_token) else {
        return (delivery.clear(kind, jar), ApiError::App(AppError::Unauthorized)).into_response();
    };

    match SessionService::new(state.service_context())
        .refresh(&presented, ip.as_deref())
        .await
    {
        Ok(tokens) => delivery.deliver(kind, jar, tokens).into_response(),
        Err(e) => (delivery.clear(kind, jar), ApiError::from(e)).into_response(),
    }
}

/// Revoke the presented refresh token; always succeeds
///
/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    kind: ClientKind,
    ip: ClientIp,
    jar: CookieJar,
    body: Option<Json<LogoutRequest>>,
) -> (CookieJar, Json<MessageResponse>) {
    let delivery = state.delivery();
    let body_token = body.and_then(|Json(b)| b.refresh_token);
    let presented = delivery.presented_token(kind, &jar, body_token);

    SessionService::new(state.service_context())
        .logout(presented.as_deref(), ip.as_deref())
        .await;

    (
        delivery.clear(kind, jar),
        Json(MessageResponse::new("Logged out")),
    )
}

/// Revoke every refresh token of the authenticated account
///
/// POST /auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    auth: AuthUser,
    kind: ClientKind,
    ip: ClientIp,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<LogoutAllResponse>)> {
    let revoked = SessionService::new(state.service_context())
        .logout_everywhere(auth.account_id, ip.as_deref())
        .await?;

    Ok((
        state.delivery().clear(kind, jar),
        Json(LogoutAllResponse {
            message: "Logged out from all sessions".to_string(),
            revoked,
        }),
    ))
}

/// Identity carried by the access token
///
/// GET /auth/me
pub async fn me(auth: AuthUser) -> Json<CurrentAccountResponse> {
    Json(auth.claims.into())
}

/// Active refresh tokens of the authenticated account
///
/// GET /auth/sessions
pub async fn sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<SessionResponse>>> {
    let sessions = SessionService::new(state.service_context())
        .active_sessions(auth.account_id)
        .await?;

    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}
