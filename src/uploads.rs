//! Provisional uploads: content goes to `LocalFileStorage`, a row goes to
//! `files` unclaimed, and the owner claims it later.

use actix_multipart::form::tempfile::TempFile;
use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::file::{self, FileContext, NewFile, StoredFile};
use crate::storage::LocalFileStorage;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Persist a multipart upload for `context`, unclaimed.
pub async fn store_upload(
    pool: &PgPool,
    storage: &LocalFileStorage,
    context: &FileContext,
    upload: TempFile,
) -> Result<StoredFile, AppError> {
    let filename = upload
        .file_name
        .as_deref()
        .and_then(sanitize_filename)
        .ok_or_else(|| AppError::Validation("The uploaded file has no name.".to_string()))?;
    let content_type = upload
        .content_type
        .as_ref()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let storage_key = storage.store_from_path(upload.file.path()).await?;
    let new = NewFile {
        filename: &filename,
        content_type: &content_type,
        size: upload.size as i64,
        storage_key: &storage_key,
        context,
    };
    match file::create(pool, &new).await {
        Ok(stored) => {
            log::info!(
                "Stored upload {} ({filename}, {} bytes) for {}/{}/{}",
                stored.uuid,
                stored.size,
                context.object_type,
                context.object_id,
                context.kind
            );
            Ok(stored)
        }
        Err(e) => {
            if let Err(cleanup) = storage.delete(&storage_key).await {
                log::warn!("Could not remove orphaned upload {storage_key}: {cleanup}");
            }
            Err(e.into())
        }
    }
}

/// Last path component of a client supplied file name, trimmed. Browsers
/// on some platforms send full paths.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Remove unclaimed uploads older than `ttl` from the database and storage.
pub async fn purge_unclaimed(pool: &PgPool, storage: &LocalFileStorage, ttl: Duration) -> Result<usize, AppError> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| AppError::Internal(format!("Invalid unclaimed file TTL: {e}")))?;
    let keys = file::delete_unclaimed_before(pool, Utc::now() - ttl).await?;
    for key in &keys {
        if let Err(e) = storage.delete(key).await {
            log::warn!("Could not remove unclaimed upload {key}: {e}");
        }
    }
    if !keys.is_empty() {
        log::info!("Purged {} unclaimed uploads", keys.len());
    }
    Ok(keys.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_stripped_from_file_names() {
        assert_eq!(sanitize_filename("book.pdf").as_deref(), Some("book.pdf"));
        assert_eq!(sanitize_filename("/home/me/book.pdf").as_deref(), Some("book.pdf"));
        assert_eq!(sanitize_filename(r"C:\Users\me\Book Final.PDF").as_deref(), Some("Book Final.PDF"));
        assert_eq!(sanitize_filename("  spaced.pdf ").as_deref(), Some("spaced.pdf"));
    }

    #[test]
    fn empty_or_relative_names_are_rejected() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("uploads/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("   "), None);
    }
}
