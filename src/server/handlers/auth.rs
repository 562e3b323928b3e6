use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    auth::{authenticate, AuthError},
    sessions::{current_user, destroy},
    templates::{HtmlTemplate, LoginTemplate},
};

use crate::server::utils::{bad_request_response, server_error_response};

use super::shared::layout_from_session;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
}

pub async fn login_form_handler(session: Session) -> Response {
    match current_user(&session).await {
        Ok(Some(_)) => Redirect::to("/").into_response(),
        Ok(None) => {
            let layout = layout_from_session(&session, "Log in").await;
            HtmlTemplate::new(LoginTemplate::new(layout)).into_response()
        }
        Err(err) => {
            error!(target: "auth", %err, "failed to read user from session");
            server_error_response()
        }
    }
}

pub async fn login_submit_handler(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(err) => {
            warn!(target: "auth", %err, "malformed login form");
            return bad_request_response("Username and password are required.");
        }
    };

    match authenticate(state.db(), &session, &form.username, &form.password).await {
        Ok(()) => {
            info!(target: "auth", username = %form.username, "user logged in");
            Redirect::to("/").into_response()
        }
        Err(err) if err.is_credential_failure() => {
            // The reason stays in the log; the client only sees a generic bad login
            warn!(target: "auth", username = %form.username, reason = %err, "login rejected");
            let layout = layout_from_session(&session, "Log in").await;
            HtmlTemplate::with_status(
                LoginTemplate::new(layout).bad_login(form.username),
                StatusCode::UNAUTHORIZED,
            )
            .into_response()
        }
        Err(err @ AuthError::CorruptCredential { .. }) => {
            error!(target: "auth", %err, "stored credential could not be used");
            server_error_response()
        }
        Err(err) => {
            error!(target: "auth", %err, "error verifying credentials");
            server_error_response()
        }
    }
}

pub async fn logout_handler(session: Session) -> Response {
    let user = current_user(&session).await.ok().flatten();

    if let Err(err) = destroy(&session).await {
        error!(target: "auth", %err, "failed to destroy session on logout");
        return server_error_response();
    }

    if let Some(user) = user {
        info!(target: "auth", username = %user, "user logged out");
    }

    Redirect::to("/").into_response()
}
