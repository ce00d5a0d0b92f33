//! Local filesystem storage for uploaded file content.
//!
//! Content lives under `<base>/<first two uuid chars>/<uuid>.dat`; the
//! returned key is the path relative to the base directory.

use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// Store content and return its storage key.
    pub async fn store(&self, content: &[u8]) -> io::Result<String> {
        let (storage_key, full_path) = self.new_location().await?;

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;

        Ok(storage_key)
    }

    /// Copy an already written file (e.g. a multipart temp file) into storage
    /// without loading it into memory.
    pub async fn store_from_path(&self, source: &Path) -> io::Result<String> {
        let (storage_key, full_path) = self.new_location().await?;
        if let Err(e) = fs::copy(source, &full_path).await {
            let _ = fs::remove_file(&full_path).await;
            return Err(e);
        }
        Ok(storage_key)
    }

    /// Filesystem path of stored content, for streaming it out.
    pub fn path(&self, storage_key: &str) -> io::Result<PathBuf> {
        self.resolve(storage_key)
    }

    pub async fn retrieve(&self, storage_key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(storage_key)?).await
    }

    /// Remove stored content. Missing content is not an error.
    pub async fn delete(&self, storage_key: &str) -> io::Result<()> {
        match fs::remove_file(self.resolve(storage_key)?).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    pub async fn exists(&self, storage_key: &str) -> io::Result<bool> {
        fs::try_exists(self.resolve(storage_key)?).await
    }

    async fn new_location(&self) -> io::Result<(String, PathBuf)> {
        let file_uuid = Uuid::new_v4().to_string();
        let storage_key = format!("{}/{}.dat", &file_uuid[..2], file_uuid);
        let full_path = self.base_path.join(&storage_key);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok((storage_key, full_path))
    }

    fn resolve(&self, storage_key: &str) -> io::Result<PathBuf> {
        let key = Path::new(storage_key);
        if key.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key {storage_key:?}"),
            ));
        }
        Ok(self.base_path.join(key))
    }
}
