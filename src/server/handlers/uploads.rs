use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::{debug, error, warn};

use crate::{
    app_state::AppState,
    templates::{FileFormTemplate, HtmlTemplate, UploadSuccessTemplate},
};

use crate::server::{constants::UPLOAD_FILE_FIELD, utils::human_readable_size};

use super::shared::{layout_from_session, require_uploader, upload_error_message, WriteGate};

/// File part of a multipart submission, fully buffered.
struct ReceivedFile {
    name: String,
    bytes: axum::body::Bytes,
}

/// GET /files — display file upload form.
pub async fn file_form_handler(State(state): State<AppState>, session: Session) -> Response {
    if let Err(response) = require_uploader(&state, &session, WriteGate::Page).await {
        return response;
    }

    render_file_form(&state, &session, StatusCode::OK, None).await
}

/// POST /files — handle multipart file uploads.
pub async fn file_submit_handler(
    State(state): State<AppState>,
    session: Session,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let uploader = match require_uploader(&state, &session, WriteGate::Submit).await {
        Ok(uploader) => uploader,
        Err(response) => return response,
    };

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(err) => {
            warn!(target: "upload", %err, "upload is not a multipart form");
            return render_file_form(
                &state,
                &session,
                err.status(),
                Some("The upload form could not be processed. Please try again."),
            )
            .await;
        }
    };

    let mut title: Option<String> = None;
    let mut received: Option<ReceivedFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return multipart_failure(&state, &session, err).await,
        };

        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(UPLOAD_FILE_FIELD) => {
                if received.is_some() {
                    return render_file_form(
                        &state,
                        &session,
                        StatusCode::BAD_REQUEST,
                        Some("Only one file can be uploaded at a time."),
                    )
                    .await;
                }

                let name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => received = Some(ReceivedFile { name, bytes }),
                    Err(err) => return multipart_failure(&state, &session, err).await,
                }
            }
            Some("title") => match field.text().await {
                Ok(value) => title = Some(value),
                Err(err) => return multipart_failure(&state, &session, err).await,
            },
            _ => {
                if let Err(err) = field.bytes().await {
                    debug!(
                        target: "upload",
                        field = field_name.as_deref().unwrap_or(""),
                        %err,
                        "discarding unexpected multipart field"
                    );
                }
            }
        }
    }

    let Some(file) = received else {
        return render_file_form(
            &state,
            &session,
            StatusCode::BAD_REQUEST,
            Some("Select a file before uploading."),
        )
        .await;
    };

    let max_file_size = state.config().uploads.max_file_size_bytes;
    if file.bytes.len() as u64 > max_file_size {
        warn!(target: "upload", size = file.bytes.len(), limit = max_file_size, "upload too large");
        return render_file_form(
            &state,
            &session,
            StatusCode::PAYLOAD_TOO_LARGE,
            Some("That file is larger than the upload limit."),
        )
        .await;
    }

    let result = state
        .uploads()
        .store_file(&file.name, &file.bytes, title.as_deref(), &uploader)
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
        Err(err) => {
            let (status, message) = upload_error_message(&err);
            if status.is_server_error() {
                error!(target: "upload", %err, uploader = %uploader, "failed to store uploaded file");
            } else {
                warn!(target: "upload", %err, name = %file.name, "upload rejected");
            }
            render_file_form(&state, &session, status, Some(message)).await
        }
    }
}

async fn multipart_failure(state: &AppState, session: &Session, err: MultipartError) -> Response {
    let status = err.status();
    warn!(target: "upload", %err, %status, "failed to read multipart upload");

    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "That file is larger than the upload limit."
    } else {
        "The upload form could not be processed. Please try again."
    };

    render_file_form(state, session, status, Some(message)).await
}

async fn render_file_form(
    state: &AppState,
    session: &Session,
    status: StatusCode,
    error_message: Option<&str>,
) -> Response {
    let layout = layout_from_session(session, "Upload file").await;
    let max_size = human_readable_size(state.config().uploads.max_file_size_bytes);
    let mut template = FileFormTemplate::new(layout, max_size);

    if let Some(message) = error_message {
        template = template.with_error_message(message);
    }

    HtmlTemplate::with_status(template, status).into_response()
}
