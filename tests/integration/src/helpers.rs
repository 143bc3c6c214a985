//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests,
//! and asserting on responses.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clinic_api::{create_app, create_in_memory_state, run_server};
use clinic_common::AppConfig;
use clinic_db::InMemoryAccountStore;
use cookie::Cookie;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::fixtures::SeededAccount;

/// Name of the refresh-token cookie in the test configuration
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub accounts: Arc<InMemoryAccountStore>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with the default test configuration
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let state = create_in_memory_state(config, accounts.clone())?;
        let app = create_app(state)?;

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            run_server(app, listener).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            accounts,
            handle,
        })
    }

    /// Register an account directly in the backing store
    pub fn seed(&self, account: &SeededAccount) -> Result<clinic_core::AccountId> {
        Ok(self.accounts.add_account(
            &account.email,
            &account.username,
            &account.password,
            account.claims(),
        )?)
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Make a GET request with a bearer token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).bearer_auth(token).send().await?)
    }

    /// POST a JSON body as a browser client
    pub async fn post_web<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    /// POST with only the refresh cookie, as a browser does for refresh and logout
    pub async fn post_with_cookie(&self, path: &str, refresh_token: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .header(header::COOKIE, format!("{REFRESH_COOKIE}={refresh_token}"))
            .send()
            .await?)
    }

    /// POST a JSON body as a mobile client
    pub async fn post_mobile<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(mobile(self.client.post(self.url(path))).json(body).send().await?)
    }

    /// POST with a bearer token as a mobile client
    pub async fn post_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(mobile(self.client.post(self.url(path)))
            .bearer_auth(token)
            .send()
            .await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mobile(request: RequestBuilder) -> RequestBuilder {
    request.header("X-Client-Type", "mobile")
}

/// In-memory configuration with a generous rate limit
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::in_memory("integration-test-secret");
    config.rate_limit.requests_per_second = 1000;
    config.rate_limit.burst = 1000;
    config
}

/// The refresh-token cookie set by a response, if any
pub fn refresh_cookie(response: &Response) -> Option<Cookie<'static>> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_owned()).ok())
        .find(|c| c.name() == REFRESH_COOKIE)
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
