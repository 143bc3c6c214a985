//! API Integration Tests
//!
//! Each test spawns the real router on a local port over in-memory storage;
//! no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{
    assert_json, assert_status, fixtures::*, refresh_cookie, test_config, TestServer,
};
use reqwest::StatusCode;
use serde_json::json;

async fn started() -> (TestServer, SeededAccount) {
    let server = TestServer::start().await.expect("Failed to start server");
    let account = SeededAccount::unique();
    server.seed(&account).expect("Failed to seed account");
    (server, account)
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready_in_memory() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health/ready").await.unwrap();
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["checks"]["database"], "in_memory");
}

// ============================================================================
// Login Tests
// ============================================================================

#[tokio::test]
async fn test_mobile_login_returns_refresh_in_body() {
    let (server, account) = started().await;

    let response = server.post_mobile("/auth/login", &account.login()).await.unwrap();
    assert!(refresh_cookie(&response).is_none());
    let tokens: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.expires_in, 900);
    assert!(!tokens.access_token.is_empty());
    assert!(tokens.refresh_token.is_some());
    assert!(tokens.refresh_token_expires_at.is_some());
    assert_eq!(tokens.email_confirmed, Some(true));
}

#[tokio::test]
async fn test_web_login_sets_refresh_cookie() {
    let (server, account) = started().await;

    let response = server.post_web("/auth/login", &account.login()).await.unwrap();
    let cookie = refresh_cookie(&response).expect("refresh cookie");
    let tokens: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();

    assert!(tokens.refresh_token.is_none());
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(cookie::SameSite::Strict));
    assert_eq!(cookie.path(), Some("/auth"));
    assert_eq!(
        cookie.max_age().map(|d| d.whole_seconds()),
        Some(7 * 24 * 60 * 60)
    );
}

#[tokio::test]
async fn test_login_by_username() {
    let (server, account) = started().await;

    let request = LoginRequest {
        identifier: account.username.clone(),
        password: account.password.clone(),
    };
    let response = server.post_mobile("/auth/login", &request).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_login_accepts_email_field_alias() {
    let (server, account) = started().await;

    let body = json!({ "email": account.email, "password": account.password });
    let response = server.post_mobile("/auth/login", &body).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_login_failures_look_identical() {
    let (server, account) = started().await;

    let wrong_password = server
        .post_mobile("/auth/login", &account.login_with_password("nope"))
        .await
        .unwrap();
    let wrong: ErrorBody = assert_json(wrong_password, StatusCode::BAD_REQUEST).await.unwrap();

    let unknown = LoginRequest {
        identifier: "ghost@clinic.test".to_string(),
        password: "whatever".to_string(),
    };
    let unknown = server.post_mobile("/auth/login", &unknown).await.unwrap();
    let unknown: ErrorBody = assert_json(unknown, StatusCode::BAD_REQUEST).await.unwrap();

    assert_eq!(wrong.error.code, "INVALID_CREDENTIALS");
    assert_eq!(wrong.error.code, unknown.error.code);
    assert_eq!(wrong.error.message, unknown.error.message);
}

#[tokio::test]
async fn test_login_validation_error() {
    let (server, _) = started().await;

    let request = LoginRequest {
        identifier: String::new(),
        password: "x".to_string(),
    };
    let response = server.post_mobile("/auth/login", &request).await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let (server, account) = started().await;

    for _ in 0..5 {
        let response = server
            .post_mobile("/auth/login", &account.login_with_password("wrong"))
            .await
            .unwrap();
        assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
    }

    // Correct password is rejected while locked, with the same error
    let response = server.post_mobile("/auth/login", &account.login()).await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_unconfirmed_email_reported_not_blocking() {
    let (server, _) = started().await;

    let unconfirmed = server
        .accounts
        .add_account("late@clinic.test", "late", "late-password", Default::default())
        .unwrap();
    server.accounts.set_email_confirmed(unconfirmed, false).unwrap();

    let request = LoginRequest {
        identifier: "late@clinic.test".to_string(),
        password: "late-password".to_string(),
    };
    let response = server.post_mobile("/auth/login", &request).await.unwrap();
    let tokens: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(tokens.email_confirmed, Some(false));
}

// ============================================================================
// Refresh Tests
// ============================================================================

#[tokio::test]
async fn test_mobile_refresh_rotates() {
    let (server, account) = started().await;

    let response = server.post_mobile("/auth/login", &account.login()).await.unwrap();
    let login: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();
    let first = login.refresh_token.unwrap();

    let response = server
        .post_mobile("/auth/refresh", &RefreshTokenRequest { refresh_token: first.clone() })
        .await
        .unwrap();
    let rotated: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();
    let second = rotated.refresh_token.unwrap();
    assert_ne!(first, second);
    assert!(rotated.email_confirmed.is_none());

    // The consumed token is single-use
    let response = server
        .post_mobile("/auth/refresh", &RefreshTokenRequest { refresh_token: first })
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_web_refresh_uses_cookie() {
    let (server, account) = started().await;

    let response = server.post_web("/auth/login", &account.login()).await.unwrap();
    let first = refresh_cookie(&response).unwrap().value().to_owned();

    let response = server.post_with_cookie("/auth/refresh", &first).await.unwrap();
    let second = refresh_cookie(&response).expect("rotated cookie").value().to_owned();
    let tokens: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();

    assert_ne!(first, second);
    assert!(tokens.refresh_token.is_none());
    assert!(!tokens.access_token.is_empty());
}

#[tokio::test]
async fn test_web_refresh_failure_clears_cookie() {
    let (server, _) = started().await;

    let response = server.post_with_cookie("/auth/refresh", "forged").await.unwrap();
    let cookie = refresh_cookie(&response).expect("clearing cookie");
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age().map(|d| d.whole_seconds()), Some(0));
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_refresh_without_token_is_unauthorized() {
    let (server, _) = started().await;

    let response = server.post_mobile("/auth/refresh", &json!({})).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

// ============================================================================
// Logout Tests
// ============================================================================

#[tokio::test]
async fn test_logout_revokes_and_is_idempotent() {
    let (server, account) = started().await;

    let response = server.post_mobile("/auth/login", &account.login()).await.unwrap();
    let login: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();
    let body = RefreshTokenRequest {
        refresh_token: login.refresh_token.unwrap(),
    };

    for _ in 0..2 {
        let response = server.post_mobile("/auth/logout", &body).await.unwrap();
        let message: MessageResponse = assert_json(response, StatusCode::OK).await.unwrap();
        assert!(!message.message.is_empty());
    }

    let response = server.post_mobile("/auth/refresh", &body).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_logout_without_token_succeeds() {
    let (server, _) = started().await;

    let response = server.post_mobile("/auth/logout", &json!({})).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server.post_with_cookie("/auth/logout", "unknown").await.unwrap();
    let cookie = refresh_cookie(&response).expect("clearing cookie");
    assert_eq!(cookie.value(), "");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_logout_all_revokes_every_session() {
    let (server, account) = started().await;

    let mut refresh_tokens = Vec::new();
    let mut access_token = String::new();
    for _ in 0..2 {
        let response = server.post_mobile("/auth/login", &account.login()).await.unwrap();
        let tokens: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();
        refresh_tokens.push(tokens.refresh_token.unwrap());
        access_token = tokens.access_token;
    }

    let response = server.get_auth("/auth/sessions", &access_token).await.unwrap();
    let sessions: Vec<SessionResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].created_by_ip.as_deref(), Some("127.0.0.1"));

    let response = server.post_auth("/auth/logout-all", &access_token).await.unwrap();
    let body: LogoutAllResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body.revoked, 2);

    for token in refresh_tokens {
        let response = server
            .post_mobile("/auth/refresh", &RefreshTokenRequest { refresh_token: token })
            .await
            .unwrap();
        assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
    }

    // Access tokens stay valid until they expire
    let response = server.get_auth("/auth/sessions", &access_token).await.unwrap();
    let sessions: Vec<SessionResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(sessions.is_empty());
}

// ============================================================================
// Access Token Tests
// ============================================================================

#[tokio::test]
async fn test_me_returns_claims() {
    let (server, account) = started().await;

    let response = server.post_mobile("/auth/login", &account.login()).await.unwrap();
    let tokens: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();

    let response = server.get_auth("/auth/me", &tokens.access_token).await.unwrap();
    let me: CurrentAccountResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(me.roles, vec!["Doctor".to_string()]);
    assert_eq!(me.tenant_id.as_deref(), Some("tenant-1"));
    assert!(!me.account_id.is_empty());
    assert!(me.expires_at.is_some());
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let (server, _) = started().await;

    let response = server.get("/auth/me").await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "MISSING_AUTH");

    let response = server.get_auth("/auth/me", "not.a.jwt").await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "INVALID_TOKEN");
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let (server, account) = started().await;

    let mut other_config = test_config();
    other_config.jwt.secret = "a-different-secret".to_string();
    let other = TestServer::start_with_config(other_config).await.unwrap();
    other.seed(&account).unwrap();

    let response = other.post_mobile("/auth/login", &account.login()).await.unwrap();
    let foreign: TokenResponse = assert_json(response, StatusCode::OK).await.unwrap();

    let response = server.get_auth("/auth/me", &foreign.access_token).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
