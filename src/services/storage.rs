//! Local filesystem storage for uploaded PDFs.

use crate::error::{Result, SplitError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct UploadStore {
    dir: Arc<PathBuf>,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Arc::new(dir) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.dir.as_path()).await?;
        Ok(())
    }

    /// Writes the upload under its client-supplied name, replacing any earlier copy.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(stored_name(filename)?);
        tokio::fs::write(&path, data).await?;
        debug!("Stored upload {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    /// Path of a previously stored upload.
    pub fn locate(&self, filename: &str) -> Result<PathBuf> {
        let path = self.dir.join(stored_name(filename)?);
        if !path.is_file() {
            return Err(SplitError::NotFound(filename.to_string()));
        }
        Ok(path)
    }
}

/// Only a bare file name is accepted; anything with a directory part is rejected.
fn stored_name(filename: &str) -> Result<&str> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| *n == filename && !n.starts_with('.'));
    name.ok_or_else(|| SplitError::InvalidArgument(format!("invalid file name: {:?}", filename)))
}
