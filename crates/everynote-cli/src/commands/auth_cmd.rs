use everynote_core::auth::{
    AuthError, AuthStatus, BetterAuthClient, FileSessionStore, SessionErrorKind,
    SessionPersistence, SessionState, SessionStore, DEFAULT_STORAGE_NAME,
};
use everynote_core::User;

use crate::cli::AuthCommands;
use crate::config::CliSettings;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, settings: &CliSettings) -> Result<(), CliError> {
    let slot = FileSessionStore::new(&settings.data_dir, DEFAULT_STORAGE_NAME);

    let Some(auth_url) = settings.auth_url.as_deref() else {
        if matches!(command, AuthCommands::Status) {
            let cached = slot.load()?.and_then(|session| session.user);
            println!("{}", describe_cached_user(cached.as_ref()));
            return Ok(());
        }
        return Err(AuthError::NotConfigured.into());
    };

    let client = BetterAuthClient::new(auth_url)?
        .with_session_token(settings.session_token.clone())
        .with_redirect_handler(|url| println!("Open this URL to finish signing in:\n{url}"));
    let store = SessionStore::new(client, slot).with_callback_url(settings.callback_url.clone());

    let state = match command {
        AuthCommands::Status => store.check_session().await,
        AuthCommands::Login => store.login().await,
        AuthCommands::Logout => store.logout().await,
    };

    if let Some(error) = &state.error {
        return Err(CliError::Session(match error.kind {
            SessionErrorKind::LogoutFailed => {
                format!("{} (local session cleared)", error.message)
            }
            SessionErrorKind::SessionCheckFailed | SessionErrorKind::LoginFailed => {
                error.message.clone()
            }
        }));
    }

    if matches!(command, AuthCommands::Login) && state.user.is_none() {
        println!("Finish signing in with your browser, then run `everynote auth status`.");
    } else {
        println!("{}", describe_session(&state));
    }
    Ok(())
}

pub fn describe_session(state: &SessionState) -> String {
    match (state.status(), state.user.as_ref()) {
        (AuthStatus::Authenticated, Some(user)) => format!("Signed in as {}", user_label(user)),
        (AuthStatus::Error, _) => state
            .error
            .as_ref()
            .map_or_else(String::new, |error| error.message.clone()),
        (AuthStatus::Loading, _) => "Checking session...".to_string(),
        (AuthStatus::Uninitialized, _) => "Session not checked yet.".to_string(),
        _ => "Not signed in.".to_string(),
    }
}

pub fn describe_cached_user(user: Option<&User>) -> String {
    user.map_or_else(
        || "Not signed in.".to_string(),
        |user| format!("Signed in as {} (cached, not verified)", user_label(user)),
    )
}

fn user_label(user: &User) -> String {
    if user.email.trim().is_empty() || user.display_name() == user.email {
        user.display_name().to_string()
    } else {
        format!("{} <{}>", user.display_name(), user.email)
    }
}
