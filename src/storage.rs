use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;

use crate::filenames::{self, FilenameError};

#[derive(Debug, Error)]
pub enum UploadDirError {
    #[error(transparent)]
    InvalidFilename(#[from] FilenameError),
    #[error("{0} already exists in the uploads directory")]
    AlreadyExists(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The directory holding one file per upload record.
#[derive(Debug, Clone)]
pub struct UploadsDir {
    root: PathBuf,
}

impl UploadsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join a name onto the uploads directory after sanitizing it.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, FilenameError> {
        let safe = filenames::sanitize(name)?;
        Ok(self.root.join(safe))
    }

    /// Write `bytes` to a new file called `name`.
    ///
    /// Never overwrites: an existing file yields [`UploadDirError::AlreadyExists`].
    /// The file is owner read/write only and synced before returning. A
    /// partially written file is removed on failure.
    pub async fn write_new(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, UploadDirError> {
        let path = self.resolve(name)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = match options.open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(UploadDirError::AlreadyExists(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(err) = written {
            drop(file);
            if let Err(clean_err) = self.remove_path(&path).await {
                warn!(
                    target: "upload",
                    path = %path.display(),
                    %clean_err,
                    "failed to remove partially written file"
                );
            }
            return Err(err.into());
        }

        Ok(path)
    }

    /// Remove a file by absolute path. A file that is already gone is fine.
    pub async fn remove_path(&self, path: &Path) -> Result<(), std::io::Error> {
        match fs::remove_file(path).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
