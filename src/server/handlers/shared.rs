use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::error;

use crate::{
    app_state::AppState,
    sessions::current_user,
    templates::LayoutContext,
    uploads::{ReadError, UploadError},
};

use crate::server::utils::{
    bad_request_response, server_error_response, unauthorized_response,
    upload_not_found_response,
};

/// Build a [`LayoutContext`] from the current session, falling back to an anonymous layout when
/// the session lookup fails.
pub async fn layout_from_session(session: &Session, title: &str) -> LayoutContext {
    match LayoutContext::from_session(session, title).await {
        Ok(layout) => layout,
        Err(err) => {
            error!(target: "templates", %err, "failed to build layout context from session");
            LayoutContext::anonymous(title)
        }
    }
}

/// How a write route should turn away a visitor who is not logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGate {
    /// Form pages redirect to the login page.
    Page,
    /// Submissions are rejected with 401.
    Submit,
}

/// Resolve the uploader name for a write route.
///
/// With `require_login` set, anonymous visitors are turned away according to
/// `gate`. Otherwise anonymous writes are attributed to the empty string.
pub async fn require_uploader(
    state: &AppState,
    session: &Session,
    gate: WriteGate,
) -> Result<String, Response> {
    let user = match current_user(session).await {
        Ok(user) => user,
        Err(err) => {
            error!(target: "sessions", %err, "failed to read session for write route");
            return Err(server_error_response());
        }
    };

    match user {
        Some(user) => Ok(user),
        None if !state.config().uploads.require_login => Ok(String::new()),
        None => Err(match gate {
            WriteGate::Page => Redirect::to("/login").into_response(),
            WriteGate::Submit => unauthorized_response(),
        }),
    }
}

/// Map a read-path failure onto a response, logging anything that is not a
/// plain miss.
pub fn read_error_response(id: i64, err: ReadError) -> Response {
    match err {
        ReadError::NotFound(_) => upload_not_found_response(),
        ReadError::FileMissing { .. } => {
            error!(target: "files", id, %err, "upload record has no backing file");
            upload_not_found_response()
        }
        ReadError::InvalidStoredPath { .. } | ReadError::Io(_) | ReadError::Store(_) => {
            error!(target: "files", id, %err, "failed to resolve upload");
            server_error_response()
        }
    }
}

/// Status and user-facing message for a failed write.
pub fn upload_error_message(err: &UploadError) -> (StatusCode, &'static str) {
    match err {
        UploadError::MissingField(_) => (StatusCode::BAD_REQUEST, "Nothing to upload."),
        UploadError::InvalidFilename(_) => (
            StatusCode::BAD_REQUEST,
            "That file name can't be used. Rename the file and try again.",
        ),
        UploadError::NameTaken(_) => (
            StatusCode::CONFLICT,
            "A file with that name already exists. Rename the file and try again.",
        ),
        UploadError::NameExhausted(_) | UploadError::Io(_) | UploadError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unable to process your request. Please try again later.",
        ),
    }
}

/// Parse a path id, answering 400 for anything that is not a positive integer.
pub fn parse_id_or_bad_request(raw: &str) -> Result<i64, Response> {
    crate::uploads::parse_upload_id(raw)
        .ok_or_else(|| bad_request_response("Upload ids are positive whole numbers."))
}
