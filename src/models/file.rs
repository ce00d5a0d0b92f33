use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use std::path::Path;
use uuid::Uuid;

/// The object an upload is destined for, fixed at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    pub object_type: String,
    pub object_id: i64,
    pub kind: String,
}

impl FileContext {
    pub fn new(object_type: &str, object_id: i64, kind: &str) -> Self {
        FileContext {
            object_type: object_type.to_string(),
            object_id,
            kind: kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredFile {
    pub id: i64,
    pub uuid: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub storage_key: String,
    pub context_type: String,
    pub context_id: i64,
    pub context_kind: String,
    pub claimed: bool,
}

impl StoredFile {
    /// Lower-cased extension including the dot, e.g. `.pdf`.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
    }

    pub fn context(&self) -> FileContext {
        FileContext::new(&self.context_type, self.context_id, &self.context_kind)
    }
}

/// Public view returned to the uploader.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub uuid: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
}

impl From<&StoredFile> for FileInfo {
    fn from(f: &StoredFile) -> Self {
        FileInfo {
            uuid: f.uuid,
            filename: f.filename.clone(),
            content_type: f.content_type.clone(),
            size: f.size,
        }
    }
}

pub struct NewFile<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub size: i64,
    pub storage_key: &'a str,
    pub context: &'a FileContext,
}

const COLUMNS: &str = "id, uuid, filename, content_type, size, storage_key, \
                       context_type, context_id, context_kind, claimed";

pub async fn create(pool: &PgPool, new: &NewFile<'_>) -> Result<StoredFile, sqlx::Error> {
    sqlx::query_as::<_, StoredFile>(&format!(
        "INSERT INTO files (uuid, filename, content_type, size, storage_key, \
             context_type, context_id, context_kind) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.filename)
    .bind(new.content_type)
    .bind(new.size)
    .bind(new.storage_key)
    .bind(&new.context.object_type)
    .bind(new.context.object_id)
    .bind(&new.context.kind)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(exec: E, id: i64) -> Result<Option<StoredFile>, sqlx::Error> {
    sqlx::query_as::<_, StoredFile>(&format!("SELECT {COLUMNS} FROM files WHERE id = $1"))
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn find_unclaimed_by_uuid(pool: &PgPool, uuid: Uuid) -> Result<Option<StoredFile>, sqlx::Error> {
    sqlx::query_as::<_, StoredFile>(&format!(
        "SELECT {COLUMNS} FROM files WHERE uuid = $1 AND NOT claimed"
    ))
    .bind(uuid)
    .fetch_optional(pool)
    .await
}

/// Mark a file as owned. Returns `false` if it was already claimed.
pub async fn claim<'e, E: PgExecutor<'e>>(exec: E, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE files SET claimed = TRUE WHERE id = $1 AND NOT claimed")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Delete the row, returning its storage key so the caller can drop the content.
pub async fn delete<'e, E: PgExecutor<'e>>(exec: E, id: i64) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("DELETE FROM files WHERE id = $1 RETURNING storage_key")
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|r| r.0))
}

/// Delete unclaimed rows created before `cutoff`, returning their storage keys.
pub async fn delete_unclaimed_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "DELETE FROM files WHERE NOT claimed AND created_at < $1 RETURNING storage_key",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(filename: &str) -> StoredFile {
        StoredFile {
            id: 1,
            uuid: Uuid::nil(),
            filename: filename.to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 0,
            storage_key: "00/x.dat".to_string(),
            context_type: "event".to_string(),
            context_id: 7,
            context_kind: "boa".to_string(),
            claimed: false,
        }
    }

    #[test]
    fn extension_is_lowercased_with_dot() {
        assert_eq!(stored("Book.PDF").extension().as_deref(), Some(".pdf"));
        assert_eq!(stored("archive.tar.gz").extension().as_deref(), Some(".gz"));
        assert_eq!(stored("README").extension(), None);
    }

    #[test]
    fn context_reflects_upload_target() {
        assert_eq!(stored("a.pdf").context(), FileContext::new("event", 7, "boa"));
        assert_ne!(stored("a.pdf").context(), FileContext::new("event", 8, "boa"));
    }
}
