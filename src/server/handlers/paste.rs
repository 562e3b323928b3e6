use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, warn};

use crate::{
    app_state::AppState,
    templates::{HtmlTemplate, TextFormTemplate, UploadSuccessTemplate},
    uploads::UploadError,
};

use super::shared::{layout_from_session, require_uploader, upload_error_message, WriteGate};

#[derive(Debug, Deserialize)]
pub(crate) struct TextForm {
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// GET /text — display the paste form.
pub async fn text_form_handler(State(state): State<AppState>, session: Session) -> Response {
    if let Err(response) = require_uploader(&state, &session, WriteGate::Page).await {
        return response;
    }

    render_text_form(&session, StatusCode::OK, None).await
}

/// POST /text — store a text paste.
pub async fn text_submit_handler(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<TextForm>, FormRejection>,
) -> Response {
    let uploader = match require_uploader(&state, &session, WriteGate::Submit).await {
        Ok(uploader) => uploader,
        Err(response) => return response,
    };

    let form = match form {
        Ok(Form(form)) => form,
        Err(err) => {
            warn!(target: "upload", %err, "malformed paste form");
            return render_text_form(
                &session,
                StatusCode::BAD_REQUEST,
                Some("The paste form could not be processed."),
            )
            .await;
        }
    };

    let input = form.input.unwrap_or_default();
    let result = state
        .uploads()
        .store_text(&input, form.title.as_deref(), &uploader)
        .await;

    match result {
        Ok(done) => {
            let layout = layout_from_session(&session, "Uploaded").await;
            HtmlTemplate::new(UploadSuccessTemplate {
                layout,
                link: state.config().public_link(&done.page_href),
                upload_title: done.title,
            })
            .into_response()
        }
        Err(err @ UploadError::MissingField(_)) => {
            render_text_form(
                &session,
                StatusCode::BAD_REQUEST,
                Some(upload_error_message(&err).1),
            )
            .await
        }
        Err(err) => {
            error!(target: "upload", %err, uploader = %uploader, "failed to store text paste");
            let (status, message) = upload_error_message(&err);
            render_text_form(&session, status, Some(message)).await
        }
    }
}

async fn render_text_form(
    session: &Session,
    status: StatusCode,
    error_message: Option<&str>,
) -> Response {
    let layout = layout_from_session(session, "Paste text").await;
    let mut template = TextFormTemplate::new(layout);

    if let Some(message) = error_message {
        template = template.with_error_message(message);
    }

    HtmlTemplate::with_status(template, status).into_response()
}
