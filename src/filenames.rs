use thiserror::Error;

/// Longest basename accepted on most filesystems.
const MAX_FILENAME_BYTES: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),
}

/// Reduce an untrusted path-like string to a basename that is safe to join
/// onto the uploads directory.
///
/// Both `/` and `\` count as separators so that Windows-style prefixes
/// smuggled in by a client are discarded too. The result never contains a
/// separator and is never `.` or `..`.
pub fn sanitize(untrusted: &str) -> Result<String, FilenameError> {
    let trimmed = untrusted.trim_end_matches(['/', '\\']);
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let invalid = || FilenameError::InvalidFilename(untrusted.to_string());

    if base.is_empty() || base == "." || base == ".." {
        return Err(invalid());
    }

    if base.chars().any(char::is_control) {
        return Err(invalid());
    }

    if base.len() > MAX_FILENAME_BYTES {
        return Err(invalid());
    }

    Ok(base.to_string())
}
