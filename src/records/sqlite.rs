use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::{now_truncated, NewUpload, StoreError, UploadStore, UploadedFile};

#[derive(Debug, sqlx::FromRow)]
struct UploadRow {
    id: i64,
    title: String,
    uploader: String,
    file_path: String,
    created_at: i64,
}

impl TryFrom<UploadRow> for UploadedFile {
    type Error = StoreError;

    fn try_from(row: UploadRow) -> Result<Self, Self::Error> {
        let created = OffsetDateTime::from_unix_timestamp(row.created_at)
            .map_err(|_| StoreError::InvalidTimestamp(row.created_at))?;

        Ok(UploadedFile {
            id: row.id,
            title: row.title,
            uploader: row.uploader,
            file_path: row.file_path,
            created,
        })
    }
}

/// Upload records kept in the `uploaded_files` table.
#[derive(Clone, Debug)]
pub struct SqliteUploadStore {
    pool: SqlitePool,
}

impl SqliteUploadStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadStore for SqliteUploadStore {
    async fn insert(&self, upload: NewUpload<'_>) -> Result<UploadedFile, StoreError> {
        let created = now_truncated();

        let result = sqlx::query(
            r#"
            INSERT INTO uploaded_files (title, uploader, file_path, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(upload.title)
        .bind(upload.uploader)
        .bind(upload.file_path)
        .bind(created.unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(UploadedFile {
            id: result.last_insert_rowid(),
            title: upload.title.to_string(),
            uploader: upload.uploader.to_string(),
            file_path: upload.file_path.to_string(),
            created,
        })
    }

    async fn get(&self, id: i64) -> Result<UploadedFile, StoreError> {
        let row = sqlx::query_as::<_, UploadRow>(
            r#"
            SELECT id, title, uploader, file_path, created_at
            FROM uploaded_files
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        row.try_into()
    }

    async fn latest(&self, limit: usize) -> Result<Vec<UploadedFile>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, UploadRow>(
            r#"
            SELECT id, title, uploader, file_path, created_at
            FROM uploaded_files
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UploadedFile::try_from).collect()
    }
}
