use time::Duration;
use tower_sessions::{
    cookie::SameSite, session::Error as SessionError, Expiry, Session, SessionManagerLayer,
};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::SessionConfig;

pub const SESSION_AUTHENTICATED_KEY: &str = "authenticated";
pub const SESSION_USER_KEY: &str = "user";

/// The two session fields the rest of the service cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub user: String,
}

/// Mark the session as belonging to `username`.
pub async fn establish(session: &Session, username: &str) -> Result<(), SessionError> {
    session.insert(SESSION_AUTHENTICATED_KEY, true).await?;
    session.insert(SESSION_USER_KEY, username).await
}

pub async fn is_authenticated(session: &Session) -> Result<bool, SessionError> {
    Ok(session
        .get::<bool>(SESSION_AUTHENTICATED_KEY)
        .await?
        .unwrap_or(false))
}

/// Username of the logged-in visitor, if any.
pub async fn current_user(session: &Session) -> Result<Option<String>, SessionError> {
    if !is_authenticated(session).await? {
        return Ok(None);
    }
    session.get::<String>(SESSION_USER_KEY).await
}

pub async fn snapshot(session: &Session) -> Result<SessionSnapshot, SessionError> {
    match current_user(session).await? {
        Some(user) => Ok(SessionSnapshot {
            authenticated: true,
            user,
        }),
        None => Ok(SessionSnapshot::default()),
    }
}

/// Drop all session data and remove the server-side record.
pub async fn destroy(session: &Session) -> Result<(), SessionError> {
    session.flush().await
}

/// Cookie-keyed session layer: one opaque `id`-style cookie, long-lived.
pub fn session_layer(
    store: SqliteStore,
    config: &SessionConfig,
) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_expiry(Expiry::OnInactivity(Duration::days(config.lifetime_days)))
        .with_secure(config.cookie_secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_path("/")
}
