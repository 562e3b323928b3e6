use crate::{
    config::{AppConfig, RecordStoreKind},
    records::{MemoryUploadStore, SqliteUploadStore, UploadStore},
    storage::UploadsDir,
    uploads::UploadService,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Upload write/read orchestration over the selected record store
    pub uploads: Arc<UploadService>,
}

impl AppState {
    /// Create a new AppState, choosing the record store once from configuration.
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let store: Arc<dyn UploadStore> = match config.storage.record_store {
            RecordStoreKind::Sqlite => Arc::new(SqliteUploadStore::new(db.clone())),
            RecordStoreKind::Memory => Arc::new(MemoryUploadStore::new()),
        };

        info!(
            store = ?config.storage.record_store,
            uploads_dir = %config.storage.uploads_dir.display(),
            "Upload record store selected"
        );

        let uploads = UploadService::new(UploadsDir::new(&config.storage.uploads_dir), store);

        Self {
            db,
            config: Arc::new(config),
            uploads: Arc::new(uploads),
        }
    }

    /// Get a reference to the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Get a reference to the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn uploads(&self) -> &UploadService {
        &self.uploads
    }
}
