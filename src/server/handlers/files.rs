use axum::{
    extract::{Path as AxumPath, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::{
    app_state::AppState,
    templates::{FilePageTemplate, HtmlTemplate, TextPageTemplate, UploadView},
};

use crate::server::utils::human_readable_size;

use super::shared::{layout_from_session, parse_id_or_bad_request, read_error_response};

/// GET /t/{id} — show a text upload inline.
pub async fn text_page_handler(
    State(state): State<AppState>,
    session: Session,
    AxumPath(raw_id): AxumPath<String>,
) -> Response {
    let id = match parse_id_or_bad_request(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let (record, content) = match state.uploads().read_text(id).await {
        Ok(found) => found,
        Err(err) => return read_error_response(id, err),
    };

    let layout = layout_from_session(&session, record.title.as_str()).await;

    HtmlTemplate::new(TextPageTemplate {
        layout,
        upload: UploadView::from(&record),
        content,
    })
    .into_response()
}

/// GET /u/{id} — show metadata and a download link for a file upload.
pub async fn file_page_handler(
    State(state): State<AppState>,
    session: Session,
    AxumPath(raw_id): AxumPath<String>,
) -> Response {
    let id = match parse_id_or_bad_request(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let resolved = match state.uploads().resolve(id).await {
        Ok(resolved) => resolved,
        Err(err) => return read_error_response(id, err),
    };

    let upload = UploadView::from(&resolved.record);
    let is_image = upload.mime_type.starts_with("image/");
    let layout = layout_from_session(&session, upload.title.as_str()).await;

    HtmlTemplate::new(FilePageTemplate {
        layout,
        size_display: human_readable_size(resolved.metadata.len()),
        is_image,
        upload,
    })
    .into_response()
}
