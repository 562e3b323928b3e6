use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::error;

use crate::{
    app_state::AppState,
    records::RECENT_UPLOADS_LIMIT,
    server::utils::server_error_response,
    templates::{HtmlTemplate, IndexTemplate, UploadView},
};

use super::shared::layout_from_session;

/// Render the landing page with the most recent uploads.
pub async fn home_handler(State(state): State<AppState>, session: Session) -> Response {
    let records = match state.uploads().latest(RECENT_UPLOADS_LIMIT).await {
        Ok(records) => records,
        Err(err) => {
            error!(target: "files", %err, "failed to load recent uploads");
            return server_error_response();
        }
    };

    let layout = layout_from_session(&session, "Home").await;
    let uploads = records.iter().map(UploadView::from).collect();

    HtmlTemplate::new(IndexTemplate::new(layout, uploads)).into_response()
}
