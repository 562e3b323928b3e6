use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{now_truncated, NewUpload, StoreError, UploadStore, UploadedFile};

/// In-process record store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryUploadStore {
    records: RwLock<Vec<UploadedFile>>,
}

impl MemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UploadStore for MemoryUploadStore {
    async fn insert(&self, upload: NewUpload<'_>) -> Result<UploadedFile, StoreError> {
        let mut records = self.records.write().await;
        let id = records.last().map_or(1, |last| last.id + 1);

        let record = UploadedFile {
            id,
            title: upload.title.to_string(),
            uploader: upload.uploader.to_string(),
            file_path: upload.file_path.to_string(),
            created: now_truncated(),
        };
        records.push(record.clone());

        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<UploadedFile, StoreError> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn latest(&self, limit: usize) -> Result<Vec<UploadedFile>, StoreError> {
        // Insertion order already matches id order
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
