use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use time::{
    format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

/// IMF-fixdate, the preferred HTTP date format (RFC 9110 §5.6.7).
const HTTP_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Byte count in binary units, e.g. `512 B`, `1.50 KB`, `12.3 MB`.
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut scaled = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if scaled < 1024.0 {
            break;
        }
        scaled /= 1024.0;
        unit = next;
    }

    let precision = match scaled {
        v if v >= 100.0 => 0,
        v if v >= 10.0 => 1,
        _ => 2,
    };
    format!("{scaled:.precision$} {unit}")
}

/// Format an [`OffsetDateTime`] in the canonical UTC display format.
pub fn format_datetime_utc(dt: OffsetDateTime) -> String {
    let dt = dt.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02} UTC",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute()
    )
}

pub fn format_http_date(dt: OffsetDateTime) -> Option<String> {
    dt.to_offset(time::UtcOffset::UTC)
        .format(HTTP_DATE_FORMAT)
        .ok()
}

/// Parse an IMF-fixdate header value. Obsolete date formats are ignored.
pub fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Build an inline Content-Disposition header value with an ASCII fallback name.
pub fn inline_content_disposition(filename: &str) -> HeaderValue {
    let mut fallback = String::with_capacity(filename.len());
    let mut needs_extended = false;

    for ch in filename.chars() {
        if matches!(ch, ' '..='~') && ch != '"' && ch != '\\' {
            fallback.push(ch);
        } else {
            needs_extended = true;
            fallback.push('_');
        }
    }

    let header_value = if needs_extended {
        let encoded = encode_filename_for_rfc5987(filename);
        format!("inline; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
    } else {
        format!("inline; filename=\"{fallback}\"")
    };

    HeaderValue::from_str(&header_value).unwrap_or(HeaderValue::from_static("inline"))
}

/// Percent-encode a filename as an RFC 5987 `value-chars` sequence.
pub fn encode_filename_for_rfc5987(input: &str) -> String {
    fn is_attr_char(byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte)
    }

    input.bytes().fold(String::with_capacity(input.len()), |mut out, byte| {
        if is_attr_char(byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
        out
    })
}

/// Canonical application server error response body.
pub fn server_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Unable to process your request. Please try again later.",
    )
        .into_response()
}

/// Shared response for unknown upload ids and missing backing files.
pub fn upload_not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        "We couldn't find that upload. Double-check the link and try again.",
    )
        .into_response()
}

pub fn bad_request_response(message: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}

/// Response for write attempts without a logged-in session.
pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        "You need to log in before uploading.",
    )
        .into_response()
}
