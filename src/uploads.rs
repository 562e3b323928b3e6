//! Upload write and read paths.
//!
//! A write always lands the file on disk first and inserts the record only
//! after the bytes are synced, so a visible record always has a backing file.
//! A crash or failed insert in between can leave an orphaned file, which is
//! removed on a best-effort basis.

use std::{
    fs::Metadata,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::{
    filenames::{self, FilenameError},
    identifiers::generate_text_filename,
    records::{NewUpload, StoreError, UploadKind, UploadStore, UploadedFile},
    storage::{UploadDirError, UploadsDir},
};

/// Attempts at finding an unused generated name before giving up.
pub const MAX_NAME_GENERATION_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
    #[error(transparent)]
    InvalidFilename(#[from] FilenameError),
    #[error("a file named {0:?} already exists")]
    NameTaken(String),
    #[error("no unused filename after {0} attempts")]
    NameExhausted(usize),
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("no upload with id {0}")]
    NotFound(i64),
    #[error("backing file for upload {id} is missing")]
    FileMissing { id: i64 },
    #[error("upload {id} has an unusable stored path: {source}")]
    InvalidStoredPath {
        id: i64,
        #[source]
        source: FilenameError,
    },
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ReadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ReadError::NotFound(id),
            other => ReadError::Store(other),
        }
    }
}

/// Outcome of a successful write, enough to build the success page.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub id: i64,
    pub title: String,
    pub file_path: String,
    pub kind: UploadKind,
    pub page_href: String,
}

impl From<&UploadedFile> for CompletedUpload {
    fn from(record: &UploadedFile) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            file_path: record.file_path.clone(),
            kind: record.kind(),
            page_href: record.page_href(),
        }
    }
}

/// A record together with its backing file on disk.
#[derive(Debug)]
pub struct ResolvedUpload {
    pub record: UploadedFile,
    pub path: PathBuf,
    pub metadata: Metadata,
}

#[derive(Clone)]
pub struct UploadService {
    dir: UploadsDir,
    store: Arc<dyn UploadStore>,
}

impl UploadService {
    pub fn new(dir: UploadsDir, store: Arc<dyn UploadStore>) -> Self {
        Self { dir, store }
    }

    /// Store a text paste under a freshly generated `.txt` name.
    pub async fn store_text(
        &self,
        input: &str,
        title: Option<&str>,
        uploader: &str,
    ) -> Result<CompletedUpload, UploadError> {
        if input.is_empty() {
            return Err(UploadError::MissingField("input"));
        }

        let mut attempts = 0usize;
        let (name, path) = loop {
            let candidate = generate_text_filename();
            match self.dir.write_new(&candidate, input.as_bytes()).await {
                Ok(path) => break (candidate, path),
                Err(UploadDirError::AlreadyExists(_))
                    if attempts + 1 < MAX_NAME_GENERATION_ATTEMPTS =>
                {
                    attempts += 1;
                    debug!(target: "upload", name = %candidate, attempt = attempts, "generated name taken, retrying");
                }
                Err(UploadDirError::AlreadyExists(_)) => {
                    return Err(UploadError::NameExhausted(MAX_NAME_GENERATION_ATTEMPTS));
                }
                Err(err) => return Err(dir_error(err)),
            }
        };

        self.insert_record(&name, &path, title, uploader).await
    }

    /// Store an uploaded file under its sanitized client-supplied name.
    pub async fn store_file(
        &self,
        original_name: &str,
        bytes: &[u8],
        title: Option<&str>,
        uploader: &str,
    ) -> Result<CompletedUpload, UploadError> {
        let name = filenames::sanitize(original_name)?;

        let path = self
            .dir
            .write_new(&name, bytes)
            .await
            .map_err(dir_error)?;

        self.insert_record(&name, &path, title, uploader).await
    }

    async fn insert_record(
        &self,
        name: &str,
        path: &Path,
        title: Option<&str>,
        uploader: &str,
    ) -> Result<CompletedUpload, UploadError> {
        let title = match title.map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => name,
        };

        let upload = NewUpload {
            title,
            uploader,
            file_path: name,
        };

        match self.store.insert(upload).await {
            Ok(record) => {
                info!(
                    target: "upload",
                    id = record.id,
                    file_path = %record.file_path,
                    uploader = %record.uploader,
                    "upload stored"
                );
                Ok(CompletedUpload::from(&record))
            }
            Err(err) => {
                error!(target: "upload", %err, file_path = %name, "failed to insert upload record");
                if let Err(clean_err) = self.dir.remove_path(path).await {
                    warn!(
                        target: "upload",
                        path = %path.display(),
                        %clean_err,
                        "failed to remove orphaned file after record insert failure"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Resolve a record and confirm its backing file exists.
    pub async fn resolve(&self, id: i64) -> Result<ResolvedUpload, ReadError> {
        let record = self.store.get(id).await?;

        let path = self
            .dir
            .resolve(&record.file_path)
            .map_err(|source| ReadError::InvalidStoredPath { id, source })?;

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(ReadError::FileMissing { id }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ReadError::FileMissing { id });
            }
            Err(err) => return Err(err.into()),
        };

        Ok(ResolvedUpload {
            record,
            path,
            metadata,
        })
    }

    /// Resolve a record and read its contents as text.
    pub async fn read_text(&self, id: i64) -> Result<(UploadedFile, String), ReadError> {
        let resolved = self.resolve(id).await?;

        let bytes = match fs::read(&resolved.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ReadError::FileMissing { id });
            }
            Err(err) => return Err(err.into()),
        };

        Ok((
            resolved.record,
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }

    pub async fn latest(&self, limit: usize) -> Result<Vec<UploadedFile>, StoreError> {
        self.store.latest(limit).await
    }
}

fn dir_error(err: UploadDirError) -> UploadError {
    match err {
        UploadDirError::InvalidFilename(err) => UploadError::InvalidFilename(err),
        UploadDirError::AlreadyExists(name) => UploadError::NameTaken(name),
        UploadDirError::Io(err) => UploadError::Io(err),
    }
}

/// Parse a public upload id. Only positive decimal integers are valid.
pub fn parse_upload_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryUploadStore;
    use async_trait::async_trait;

    fn service(root: &Path) -> UploadService {
        UploadService::new(UploadsDir::new(root), Arc::new(MemoryUploadStore::new()))
    }

    struct FailingStore;

    #[async_trait]
    impl UploadStore for FailingStore {
        async fn insert(&self, _upload: NewUpload<'_>) -> Result<UploadedFile, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn get(&self, id: i64) -> Result<UploadedFile, StoreError> {
            Err(StoreError::NotFound(id))
        }

        async fn latest(&self, _limit: usize) -> Result<Vec<UploadedFile>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn text_upload_defaults_title_to_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path());

        let done = uploads.store_text("hello world", None, "alice").await.unwrap();
        assert_eq!(done.title, done.file_path);
        assert!(done.file_path.ends_with(".txt"));
        assert_eq!(done.kind, UploadKind::Text);
        assert_eq!(done.page_href, format!("/t/{}", done.id));
        assert_eq!(
            std::fs::read(dir.path().join(&done.file_path)).unwrap(),
            b"hello world"
        );

        let (record, text) = uploads.read_text(done.id).await.unwrap();
        assert_eq!(record.uploader, "alice");
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn blank_title_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path());

        let done = uploads
            .store_file("report.pdf", b"%PDF", Some("   "), "alice")
            .await
            .unwrap();
        assert_eq!(done.title, "report.pdf");

        let done = uploads
            .store_file("cat.png", b"png", Some("My cat"), "alice")
            .await
            .unwrap();
        assert_eq!(done.title, "My cat");
        assert_eq!(done.kind, UploadKind::File);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path());

        let err = uploads.store_text("", None, "alice").await.unwrap_err();
        assert!(matches!(err, UploadError::MissingField("input")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn file_upload_name_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path());

        let done = uploads
            .store_file("../../etc/passwd", b"root:x", None, "alice")
            .await
            .unwrap();
        assert_eq!(done.file_path, "passwd");
        assert!(dir.path().join("passwd").is_file());

        let err = uploads
            .store_file("..", b"x", None, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidFilename(_)));
    }

    #[tokio::test]
    async fn duplicate_file_name_is_name_taken() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path());

        uploads.store_file("a.bin", b"1", None, "").await.unwrap();
        let err = uploads.store_file("a.bin", b"2", None, "").await.unwrap_err();
        assert!(matches!(err, UploadError::NameTaken(_)));
        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"1");
    }

    #[tokio::test]
    async fn failed_insert_removes_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadService::new(UploadsDir::new(dir.path()), Arc::new(FailingStore));

        let err = uploads
            .store_file("doc.txt", b"data", None, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Store(_)));
        assert!(!dir.path().join("doc.txt").exists());
    }

    #[tokio::test]
    async fn missing_backing_file_is_distinct_from_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path());

        assert!(matches!(
            uploads.resolve(99).await.unwrap_err(),
            ReadError::NotFound(99)
        ));

        let done = uploads.store_file("gone.bin", b"x", None, "").await.unwrap();
        std::fs::remove_file(dir.path().join("gone.bin")).unwrap();
        assert!(matches!(
            uploads.resolve(done.id).await.unwrap_err(),
            ReadError::FileMissing { .. }
        ));
    }

    #[test]
    fn parses_only_positive_integers() {
        assert_eq!(parse_upload_id("1"), Some(1));
        assert_eq!(parse_upload_id("42"), Some(42));
        assert_eq!(parse_upload_id("0"), None);
        assert_eq!(parse_upload_id("-3"), None);
        assert_eq!(parse_upload_id("+3"), None);
        assert_eq!(parse_upload_id("abc"), None);
        assert_eq!(parse_upload_id(""), None);
        assert_eq!(parse_upload_id("99999999999999999999"), None);
    }
}
