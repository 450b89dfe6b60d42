//! Identity provider backed by a Better Auth REST API.

use std::fmt;
use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{AuthError, AuthResult, IdentityProvider, SocialProvider};
use crate::models::User;

/// Response header carrying the bearer session token
const AUTH_TOKEN_HEADER: &str = "set-auth-token";
/// Longest slice of a non-JSON error body quoted back to the user
const MAX_ERROR_BODY_CHARS: usize = 180;

type RedirectHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// HTTP client for `{base}/api/auth`.
///
/// Cookies are not kept; the session is identified by a bearer token, either
/// supplied up front or captured from the `set-auth-token` response header.
#[derive(Clone)]
pub struct BetterAuthClient {
    auth_url: String,
    client: Client,
    session_token: Arc<Mutex<Option<String>>>,
    on_redirect: RedirectHandler,
}

impl BetterAuthClient {
    pub fn new(base_url: &str) -> AuthResult<Self> {
        Ok(Self {
            auth_url: normalize_auth_url(base_url)?,
            client: Client::builder().build()?,
            session_token: Arc::new(Mutex::new(None)),
            on_redirect: Arc::new(|url: &str| {
                tracing::info!("Continue sign-in in your browser: {url}");
            }),
        })
    }

    #[must_use]
    pub fn with_session_token(mut self, token: Option<String>) -> Self {
        let token = token.filter(|token| !token.trim().is_empty());
        self.session_token = Arc::new(Mutex::new(token));
        self
    }

    /// Called with the provider's authorization URL after a social sign-in starts
    #[must_use]
    pub fn with_redirect_handler(mut self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_redirect = Arc::new(handler);
        self
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub async fn session_token(&self) -> Option<String> {
        self.session_token.lock().await.clone()
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session_token.lock().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn capture_token(&self, response: &Response) {
        let token = response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(token) = token {
            *self.session_token.lock().await = Some(token.to_string());
        }
    }
}

impl fmt::Debug for BetterAuthClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BetterAuthClient")
            .field("auth_url", &self.auth_url)
            .field("session_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl IdentityProvider for BetterAuthClient {
    async fn get_session(&self) -> AuthResult<Option<User>> {
        let request = self
            .authorized(
                self.client
                    .get(format!("{}/get-session", self.auth_url))
                    .header("Accept", "application/json"),
            )
            .await;

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        let body = response.text().await?;
        parse_session_body(&body)
    }

    async fn sign_in_social(&self, provider: SocialProvider, callback_url: &str) -> AuthResult<()> {
        let payload = serde_json::json!({
            "provider": provider.as_str(),
            "callbackURL": callback_url,
        });
        let response = self
            .client
            .post(format!("{}/sign-in/social", self.auth_url))
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        self.capture_token(&response).await;
        let sign_in = response.json::<SocialSignInResponse>().await?;
        if let Some(url) = sign_in.redirect_url() {
            (self.on_redirect)(url);
        }
        Ok(())
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let request = self
            .authorized(self.client.post(format!("{}/sign-out", self.auth_url)))
            .await;

        let response = request.send().await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        *self.session_token.lock().await = None;
        Ok(())
    }
}

/// Normalize a server base URL to its `/api/auth` endpoint root.
pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration("Auth URL must not be empty"));
    }
    let parsed = Url::parse(trimmed).map_err(|_| {
        AuthError::InvalidConfiguration("Auth URL must include http:// or https://")
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(AuthError::InvalidConfiguration(
            "Auth URL must include http:// or https://",
        ));
    }

    if parsed.path().trim_end_matches('/').ends_with("/api/auth") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/api/auth"))
    }
}

/// `get-session` answers JSON `null` when nobody is signed in
fn parse_session_body(body: &str) -> AuthResult<Option<User>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let payload = serde_json::from_str::<Option<GetSessionResponse>>(trimmed)?;
    Ok(payload.and_then(|payload| payload.user).map(Into::into))
}

#[derive(Debug, Deserialize)]
struct GetSessionResponse {
    #[serde(default)]
    user: Option<RemoteUser>,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl From<RemoteUser> for User {
    fn from(value: RemoteUser) -> Self {
        Self {
            id: value.id,
            name: value.name.unwrap_or_default(),
            email: value.email.unwrap_or_default(),
            image: value.image.filter(|image| !image.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SocialSignInResponse {
    url: Option<String>,
    redirect: Option<bool>,
}

impl SocialSignInResponse {
    fn redirect_url(&self) -> Option<&str> {
        if self.redirect == Some(false) {
            return None;
        }
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
    code: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.error).or(payload.code) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let compact: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    if compact.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact, status.as_u16())
    }
}
