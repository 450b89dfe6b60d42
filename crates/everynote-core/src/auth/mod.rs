//! Authentication: session state, its persisted slot, and identity providers.
//!
//! The [`SessionStore`] mirrors the identity provider's view of the current
//! user. It never talks to a concrete backend directly; anything implementing
//! [`IdentityProvider`] can drive it, and anything implementing
//! [`SessionPersistence`] can hold the cached user between runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::User;

mod http;
mod persistence;
mod session;

pub use http::{normalize_auth_url, BetterAuthClient};
pub use persistence::{
    FileSessionStore, MemorySessionStore, PersistedSession, SessionPersistence,
    DEFAULT_STORAGE_NAME,
};
pub use session::{
    transition, AuthStatus, SessionErrorKind, SessionEvent, SessionFailure, SessionState,
    SessionStore, DEFAULT_CALLBACK_URL,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication is not configured. Set EVERYNOTE_AUTH_URL or auth_base_url.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Api(String),
    #[error("Session storage error: {0}")]
    Storage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Upstream identity providers offered for federated sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
}

impl SocialProvider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The external authentication service.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// Look up the current session; `None` when nobody is signed in
    async fn get_session(&self) -> AuthResult<Option<User>>;

    /// Start a federated sign-in with `provider`, returning to `callback_url`
    async fn sign_in_social(&self, provider: SocialProvider, callback_url: &str)
        -> AuthResult<()>;

    /// End the current session
    async fn sign_out(&self) -> AuthResult<()>;
}
