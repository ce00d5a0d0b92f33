//! Book of abstracts generation and its PDF cache.
//!
//! One generated PDF per event is kept under the cache directory; its file
//! name is remembered in the `cache_path` BOA setting. Anything that changes
//! the book's content must call `clear_boa_cache`.
//!
//! Clearing bumps a per-event generation counter. A PDF is only recorded as
//! the cache if the generation it was built from is still current, so a book
//! rendered from settings that changed mid-build is thrown away and rebuilt.

pub mod archive;
pub mod book;
pub mod latex;
pub mod tex;

use std::io;
use std::path::{Path, PathBuf};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::boa_settings;
use crate::models::event::Event;
use book::AbstractBook;
use latex::LatexCompiler;

pub const PDF_FILE_NAME: &str = "book-of-abstracts.pdf";
pub const ZIP_FILE_NAME: &str = "book-of-abstracts.zip";

/// Builds that lose a race against `clear_boa_cache` are retried this often.
const GENERATION_ATTEMPTS: usize = 3;

/// Path of the event's book as PDF, generating it if no cached copy exists.
pub async fn create_boa(pool: &PgPool, config: &AppConfig, event: &Event) -> Result<PathBuf, AppError> {
    for _ in 0..GENERATION_ATTEMPTS {
        if let Some(path) = cached_pdf(pool, config, event.id).await? {
            log::debug!("Serving cached book of abstracts for event {}", event.id);
            return Ok(path);
        }

        let generation = boa_settings::get_cache_generation(pool, event.id).await?;
        let book = AbstractBook::load(pool, event).await?;
        let pdf = LatexCompiler::from_config(config)
            .compile(&book.render_tex()?)
            .await?;

        let filename = format!("boa-{}-{generation}.pdf", event.id);
        let path = write_cache_file(&config.cache_dir, &filename, &pdf).await?;
        if record_cache(pool, event.id, generation, &filename).await? {
            log::info!(
                "Generated book of abstracts for event {} ({} contributions, {} bytes)",
                event.id,
                book.entries.len(),
                pdf.len()
            );
            return Ok(path);
        }

        log::info!("Book of abstracts of event {} changed while it was generated, rebuilding", event.id);
        remove_cache_file(&path).await;
    }
    Err(AppError::Internal(format!(
        "book of abstracts of event {} kept changing during generation",
        event.id
    )))
}

async fn write_cache_file(cache_dir: &Path, filename: &str, pdf: &[u8]) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(cache_dir).await?;
    let final_path = cache_dir.join(filename);
    let partial_path = cache_dir.join(format!(".{filename}.{}", Uuid::new_v4()));
    tokio::fs::write(&partial_path, pdf).await?;
    if let Err(e) = tokio::fs::rename(&partial_path, &final_path).await {
        let _ = tokio::fs::remove_file(&partial_path).await;
        return Err(e.into());
    }
    Ok(final_path)
}

/// Point `cache_path` at `filename` unless the cache was cleared since
/// `generation` was read.
async fn record_cache(pool: &PgPool, event_id: i64, generation: i64, filename: &str) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;
    boa_settings::lock_cache(&mut *tx, event_id).await?;
    if boa_settings::get_cache_generation(&mut *tx, event_id).await? != generation {
        tx.rollback().await?;
        return Ok(false);
    }
    boa_settings::set_cache_path(&mut *tx, event_id, filename).await?;
    tx.commit().await?;
    Ok(true)
}

/// Zip archive of the book's TeX source.
pub async fn create_boa_tex(pool: &PgPool, event: &Event) -> Result<Vec<u8>, AppError> {
    let book = AbstractBook::load(pool, event).await?;
    archive::tex_archive(&book.render_tex()?)
}

/// Drop the cached PDF of an event and invalidate builds still in flight.
pub async fn clear_boa_cache(pool: &PgPool, config: &AppConfig, event_id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    boa_settings::lock_cache(&mut *tx, event_id).await?;
    let generation = boa_settings::bump_cache_generation(&mut *tx, event_id).await?;
    let cached = boa_settings::get_cache_path(&mut *tx, event_id).await?;
    boa_settings::delete_cache_paths(&mut *tx, event_id).await?;
    tx.commit().await?;
    log::debug!("Book of abstracts cache of event {event_id} is now at generation {generation}");

    if let Some(path) = cached.and_then(|name| cache_file(&config.cache_dir, &name)) {
        remove_cache_file(&path).await;
    }
    Ok(())
}

async fn remove_cache_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::info!("Removed cached book of abstracts {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove cached book of abstracts {}: {e}", path.display()),
    }
}

async fn cached_pdf(pool: &PgPool, config: &AppConfig, event_id: i64) -> Result<Option<PathBuf>, AppError> {
    let Some(name) = boa_settings::get_cache_path(pool, event_id).await? else {
        return Ok(None);
    };
    match cache_file(&config.cache_dir, &name) {
        Some(path) if tokio::fs::try_exists(&path).await? => Ok(Some(path)),
        _ => Ok(None),
    }
}

/// Resolve a stored cache name, accepting bare file names only.
fn cache_file(cache_dir: &Path, name: &str) -> Option<PathBuf> {
    let file_name = Path::new(name).file_name()?;
    if file_name != name {
        return None;
    }
    Some(cache_dir.join(file_name))
}
