//! Persistent upload metadata.
//!
//! Every successful upload produces exactly one [`UploadedFile`]. Records are
//! append-only: the service never updates or deletes them, so an id handed out
//! once resolves to the same record for the lifetime of the store.

mod memory;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

pub use memory::MemoryUploadStore;
pub use sqlite::SqliteUploadStore;

/// Number of rows shown in the home page listing.
pub const RECENT_UPLOADS_LIMIT: usize = 10;

/// Whether an upload renders on the text page or the file page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Text,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: i64,
    pub title: String,
    /// Username of the uploader; empty for anonymous uploads.
    pub uploader: String,
    /// Bare file name inside the uploads directory.
    pub file_path: String,
    pub created: OffsetDateTime,
}

impl UploadedFile {
    /// MIME type guessed from the stored file name's extension.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.file_path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// Top-level media type, e.g. `text`, `image` or `application`.
    pub fn media_type(&self) -> String {
        let mime = self.mime_type();
        match mime.split_once('/') {
            Some((top, _)) => top.to_string(),
            None => mime,
        }
    }

    pub fn kind(&self) -> UploadKind {
        if self.media_type() == "text" {
            UploadKind::Text
        } else {
            UploadKind::File
        }
    }

    /// Link to the rendered page for this upload.
    pub fn page_href(&self) -> String {
        match self.kind() {
            UploadKind::Text => format!("/t/{}", self.id),
            UploadKind::File => format!("/u/{}", self.id),
        }
    }

    pub fn raw_href(&self) -> String {
        format!("/dl/{}", self.id)
    }
}

/// Fields supplied by the write path; the store assigns id and timestamp.
#[derive(Debug, Clone, Copy)]
pub struct NewUpload<'a> {
    pub title: &'a str,
    pub uploader: &'a str,
    pub file_path: &'a str,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no upload with id {0}")]
    NotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist a new record and return it with its assigned id and timestamp.
    async fn insert(&self, upload: NewUpload<'_>) -> Result<UploadedFile, StoreError>;

    async fn get(&self, id: i64) -> Result<UploadedFile, StoreError>;

    /// Up to `limit` records, newest first.
    async fn latest(&self, limit: usize) -> Result<Vec<UploadedFile>, StoreError>;
}

/// Creation time truncated to whole seconds, which is what both stores keep.
pub(crate) fn now_truncated() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}
