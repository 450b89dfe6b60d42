//! Session state machine and the store that drives it.

use std::fmt;

use tokio::sync::{watch, Mutex};

use super::{AuthResult, IdentityProvider, PersistedSession, SessionPersistence, SocialProvider};
use crate::models::User;

/// Where the provider sends the browser after a federated sign-in
pub const DEFAULT_CALLBACK_URL: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    SessionCheckFailed,
    LoginFailed,
    LogoutFailed,
}

impl SessionErrorKind {
    /// Message shown when the provider reports nothing useful
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::SessionCheckFailed => "Failed to check session",
            Self::LoginFailed => "Login failed",
            Self::LogoutFailed => "Logout failed",
        }
    }
}

/// A failed session operation, kept in state until the next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionFailure {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            kind.fallback_message().to_string()
        } else {
            message
        };
        Self { kind, message }
    }
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Snapshot of the session as seen by the UI.
///
/// `resolved` flips once the provider has answered at least once; until then
/// `user` may be a value restored from the persisted slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<SessionFailure>,
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
    Error,
}

impl SessionState {
    pub const fn status(&self) -> AuthStatus {
        if self.loading {
            AuthStatus::Loading
        } else if self.error.is_some() {
            AuthStatus::Error
        } else if self.user.is_some() {
            AuthStatus::Authenticated
        } else if self.resolved {
            AuthStatus::Unauthenticated
        } else {
            AuthStatus::Uninitialized
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// User read back from the persisted slot at startup
    Restored(Option<User>),
    /// A provider call began
    Started,
    /// The provider answered with the current user, if any
    Resolved(Option<User>),
    /// Sign-out succeeded
    SignedOut,
    Failed(SessionFailure),
}

/// Advance `state` by one event.
#[must_use]
pub fn transition(state: &SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::Restored(user) => {
            if state.resolved || state.loading {
                state.clone()
            } else {
                SessionState {
                    user,
                    ..state.clone()
                }
            }
        }
        SessionEvent::Started => SessionState {
            loading: true,
            error: None,
            ..state.clone()
        },
        SessionEvent::Resolved(user) => SessionState {
            user,
            loading: false,
            error: None,
            resolved: true,
        },
        SessionEvent::SignedOut => SessionState {
            user: None,
            loading: false,
            error: None,
            resolved: true,
        },
        SessionEvent::Failed(failure) => {
            let logout_failed = failure.kind == SessionErrorKind::LogoutFailed;
            SessionState {
                user: if logout_failed {
                    None
                } else {
                    state.user.clone()
                },
                loading: false,
                error: Some(failure),
                resolved: state.resolved || logout_failed,
            }
        }
    }
}

/// Mirrors the identity provider's session and caches the user locally.
///
/// Every state change is published to subscribers; only changes to `user`
/// touch the persisted slot.
pub struct SessionStore<P, S> {
    provider: P,
    persistence: S,
    callback_url: String,
    state: watch::Sender<SessionState>,
    // Serializes slot writes so the last write holds the latest user
    persist_lock: Mutex<()>,
}

impl<P, S> SessionStore<P, S>
where
    P: IdentityProvider,
    S: SessionPersistence,
{
    /// Build a store, restoring the cached user from `persistence`.
    pub fn new(provider: P, persistence: S) -> Self {
        let restored = match persistence.load() {
            Ok(session) => session.and_then(|session| session.user),
            Err(error) => {
                tracing::warn!("Ignoring unreadable session slot: {error}");
                None
            }
        };

        let (state, _) = watch::channel(SessionState::default());
        state.send_modify(|current| *current = transition(current, SessionEvent::Restored(restored)));

        Self {
            provider,
            persistence,
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            state,
            persist_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = callback_url.into();
        self
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Ask the provider who is signed in.
    pub async fn check_session(&self) -> SessionState {
        self.apply(SessionEvent::Started).await;

        let event = match self.provider.get_session().await {
            Ok(user) => SessionEvent::Resolved(user),
            Err(error) => {
                tracing::warn!("Session check failed: {error}");
                SessionEvent::Failed(SessionFailure::new(
                    SessionErrorKind::SessionCheckFailed,
                    error.to_string(),
                ))
            }
        };
        self.apply(event).await
    }

    /// Sign in with Google, then refresh the session.
    pub async fn login(&self) -> SessionState {
        self.apply(SessionEvent::Started).await;

        let event = match self.sign_in_and_fetch().await {
            Ok(user) => SessionEvent::Resolved(user),
            Err(error) => {
                tracing::warn!("Login failed: {error}");
                SessionEvent::Failed(SessionFailure::new(
                    SessionErrorKind::LoginFailed,
                    error.to_string(),
                ))
            }
        };
        self.apply(event).await
    }

    /// Sign out. The local user is cleared even when the provider call fails.
    pub async fn logout(&self) -> SessionState {
        self.apply(SessionEvent::Started).await;

        let event = match self.provider.sign_out().await {
            Ok(()) => SessionEvent::SignedOut,
            Err(error) => {
                tracing::warn!("Logout failed: {error}");
                SessionEvent::Failed(SessionFailure::new(
                    SessionErrorKind::LogoutFailed,
                    error.to_string(),
                ))
            }
        };
        self.apply(event).await
    }

    async fn sign_in_and_fetch(&self) -> AuthResult<Option<User>> {
        self.provider
            .sign_in_social(SocialProvider::Google, &self.callback_url)
            .await?;
        self.provider.get_session().await
    }

    async fn apply(&self, event: SessionEvent) -> SessionState {
        let mut next = SessionState::default();
        let mut user_changed = false;

        self.state.send_modify(|current| {
            next = transition(current, event);
            user_changed = next.user != current.user;
            *current = next.clone();
        });

        if user_changed {
            self.persist().await;
        }
        next
    }

    /// Write the current user to the slot on the blocking pool.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let session = PersistedSession {
            user: self.state.borrow().user.clone(),
        };
        let persistence = self.persistence.clone();

        match tokio::task::spawn_blocking(move || persistence.save(&session)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::warn!("Failed to persist session: {error}"),
            Err(error) => tracing::warn!("Session persistence task failed: {error}"),
        }
    }
}
