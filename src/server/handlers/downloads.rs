use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path as AxumPath, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;
use tower_http::services::ServeFile;
use tracing::{debug, error};

use crate::app_state::AppState;

use crate::server::utils::{
    format_http_date, inline_content_disposition, parse_http_date, server_error_response,
    upload_not_found_response,
};

use super::shared::{parse_id_or_bad_request, read_error_response};

/// GET /dl/{id} — serve the raw bytes of an upload.
///
/// Range requests are handled by `ServeFile`. Validators use the record's
/// creation time rather than the file's mtime.
pub async fn download_handler(
    State(state): State<AppState>,
    AxumPath(raw_id): AxumPath<String>,
    request: Request,
) -> Response {
    let id = match parse_id_or_bad_request(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let resolved = match state.uploads().resolve(id).await {
        Ok(resolved) => resolved,
        Err(err) => return read_error_response(id, err),
    };

    let created = resolved.record.created;
    let last_modified = format_http_date(created).and_then(|v| HeaderValue::from_str(&v).ok());

    let (mut parts, body) = request.into_parts();

    if not_modified_since(&parts.headers, created) {
        debug!(target: "files", id, "upload not modified");
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        if let Some(value) = last_modified {
            response.headers_mut().insert(header::LAST_MODIFIED, value);
        }
        return response;
    }

    strip_conditional_headers(&mut parts.headers, created);

    let served = ServeFile::new(&resolved.path)
        .try_call(Request::from_parts(parts, body))
        .await;

    let mut response = match served {
        Ok(response) => response.map(Body::new),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            error!(target: "files", id, %err, "upload file vanished before it could be served");
            return upload_not_found_response();
        }
        Err(err) => {
            error!(
                target: "files",
                id,
                path = %resolved.path.display(),
                %err,
                "failed to serve upload"
            );
            return server_error_response();
        }
    };

    if response.status() == StatusCode::NOT_FOUND {
        return upload_not_found_response();
    }

    let headers = response.headers_mut();
    if let Some(value) = last_modified {
        headers.insert(header::LAST_MODIFIED, value);
    }
    headers.insert(
        header::CONTENT_DISPOSITION,
        inline_content_disposition(&resolved.record.file_path),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    response
}

fn header_date(headers: &HeaderMap, name: header::HeaderName) -> Option<OffsetDateTime> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
}

fn not_modified_since(headers: &HeaderMap, created: OffsetDateTime) -> bool {
    header_date(headers, header::IF_MODIFIED_SINCE).is_some_and(|since| created <= since)
}

/// Drop validators `ServeFile` would check against the file's mtime. A range
/// guarded by `If-Range` is kept only when the date matches `created`.
fn strip_conditional_headers(headers: &mut HeaderMap, created: OffsetDateTime) {
    if headers.contains_key(header::IF_RANGE) {
        let range_still_valid = header_date(headers, header::IF_RANGE) == Some(created);
        headers.remove(header::IF_RANGE);
        if !range_still_valid {
            headers.remove(header::RANGE);
        }
    }

    headers.remove(header::IF_MODIFIED_SINCE);
    headers.remove(header::IF_UNMODIFIED_SINCE);
}
