//! Refresh-token delivery per client kind
//!
//! Browsers get the refresh token in an `HttpOnly` cookie scoped to the auth
//! routes; mobile and API clients get it in the JSON body. The access token
//! is always in the body.

use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use clinic_common::CookieConfig;
use clinic_service::dto::TokenResponse;
use clinic_service::SessionTokens;
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};

/// Header that selects the delivery mode
pub const CLIENT_TYPE_HEADER: &str = "x-client-type";

/// How the refresh token travels between server and client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientKind {
    /// Refresh token in a cookie
    #[default]
    Web,
    /// Refresh token in the JSON body
    Mobile,
}

impl ClientKind {
    /// `mobile` and `api` (any case) select body delivery; anything else is a browser
    pub fn from_header_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("mobile") || v.eq_ignore_ascii_case("api") => {
                Self::Mobile
            }
            _ => Self::Web,
        }
    }

    pub fn is_web(self) -> bool {
        self == Self::Web
    }
}

/// Builds and reads refresh-token cookies
#[derive(Debug, Clone, Copy)]
pub struct ClientDeliveryAdapter<'a> {
    config: &'a CookieConfig,
}

impl<'a> ClientDeliveryAdapter<'a> {
    pub fn new(config: &'a CookieConfig) -> Self {
        Self { config }
    }

    /// Cookie carrying the refresh token for `max_age` seconds
    pub fn refresh_cookie(&self, token: String, max_age: i64) -> Cookie<'static> {
        Cookie::build((self.config.name.clone(), token))
            .http_only(true)
            .secure(self.config.secure)
            .same_site(SameSite::Strict)
            .path(self.config.path.clone())
            .max_age(CookieDuration::seconds(max_age.max(0)))
            .build()
    }

    /// Expired cookie that makes the browser drop the refresh token
    pub fn clearing_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.name.clone(), ""))
            .http_only(true)
            .secure(self.config.secure)
            .same_site(SameSite::Strict)
            .path(self.config.path.clone())
            .max_age(CookieDuration::seconds(0))
            .build()
    }

    /// Refresh token the client presented: cookie for web, body for mobile
    pub fn presented_token(
        &self,
        kind: ClientKind,
        jar: &CookieJar,
        body_token: Option<String>,
    ) -> Option<String> {
        let token = match kind {
            ClientKind::Web => jar.get(&self.config.name).map(|c| c.value().to_owned()),
            ClientKind::Mobile => body_token,
        };
        token.filter(|t| !t.is_empty())
    }

    /// Shape a successful login or refresh for the client
    pub fn deliver(
        &self,
        kind: ClientKind,
        jar: CookieJar,
        tokens: SessionTokens,
    ) -> (CookieJar, Json<TokenResponse>) {
        match kind {
            ClientKind::Web => {
                let cookie =
                    self.refresh_cookie(tokens.refresh_token.clone(), tokens.refresh_token_max_age);
                (
                    jar.add(cookie),
                    Json(TokenResponse::from_session(tokens, false)),
                )
            }
            ClientKind::Mobile => (jar, Json(TokenResponse::from_session(tokens, true))),
        }
    }

    /// Jar that clears the refresh cookie for web clients; unchanged otherwise
    pub fn clear(&self, kind: ClientKind, jar: CookieJar) -> CookieJar {
        if kind.is_web() {
            jar.add(self.clearing_cookie())
        } else {
            jar
        }
    }
}
