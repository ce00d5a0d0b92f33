/// Custom book of abstracts: upload a PDF, attach it, or remove it.
///
/// Uploading is two-step. `upload_file` stores the file unclaimed under the
/// event's BOA context and returns its uuid; `set_custom_boa` claims it.

use actix_multipart::form::{MultipartForm, tempfile::TempFile};
use actix_session::Session;
use actix_web::{web, Either, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::csrf;
use crate::auth::session::require_user_id;
use crate::errors::AppError;
use crate::models::event::{self, Event};
use crate::models::file::{self, FileContext, FileInfo, StoredFile};
use crate::storage::LocalFileStorage;
use crate::uploads;

pub const NOT_A_PDF_MESSAGE: &str = "Uploaded book of abstracts needs to be a \".pdf\".";

/// Upload context of an event's book of abstracts.
pub fn boa_context(event_id: i64) -> FileContext {
    FileContext::new("event", event_id, "boa")
}

#[derive(MultipartForm)]
pub struct UploadForm {
    pub file: TempFile,
}

#[derive(Deserialize)]
pub struct CustomBoaForm {
    pub file: String,
}

// ---------------------------------------------------------------------------
// POST: provisional upload
// ---------------------------------------------------------------------------

/// POST /event/{event_id}/manage/abstracts/boa/upload-file
pub async fn upload_file(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    storage: web::Data<LocalFileStorage>,
    session: Session,
    event: web::ReqData<Event>,
    MultipartForm(form): MultipartForm<UploadForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf_header(&session, &req)?;
    let stored = uploads::store_upload(&pool, &storage, &boa_context(event.id), form.file).await?;
    Ok(HttpResponse::Ok().json(FileInfo::from(&stored)))
}

// ---------------------------------------------------------------------------
// POST: attach uploaded file as custom BOA
// ---------------------------------------------------------------------------

/// POST /event/{event_id}/manage/abstracts/boa/custom
///
/// Accepts `{"file": "<uuid>"}` as JSON or urlencoded. A previously attached
/// custom BOA is deleted.
pub async fn set_custom_boa(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    storage: web::Data<LocalFileStorage>,
    session: Session,
    event: web::ReqData<Event>,
    body: Either<web::Json<CustomBoaForm>, web::Form<CustomBoaForm>>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf_header(&session, &req)?;
    let user_id = require_user_id(&session)?;
    let file_ref = match body {
        Either::Left(json) => json.into_inner().file,
        Either::Right(form) => form.into_inner().file,
    };

    let uuid = Uuid::parse_str(file_ref.trim())
        .map_err(|_| AppError::Validation("Invalid file reference.".to_string()))?;
    let upload = file::find_unclaimed_by_uuid(&pool, uuid)
        .await?
        .ok_or_else(|| AppError::Validation("The file does not exist or is already in use.".to_string()))?;
    check_boa_upload(&upload, event.id)?;

    let mut tx = pool.begin().await?;
    let previous = event::lock_custom_boa(&mut *tx, event.id).await?;
    if !file::claim(&mut *tx, upload.id).await? {
        return Err(AppError::Validation("The file does not exist or is already in use.".to_string()));
    }
    event::set_custom_boa(&mut *tx, event.id, Some(upload.id)).await?;
    let previous_key = match previous {
        Some(old_id) if old_id != upload.id => file::delete(&mut *tx, old_id).await?,
        _ => None,
    };
    tx.commit().await?;

    if let Some(key) = previous_key {
        remove_content(&storage, &key).await;
    }

    let details = serde_json::json!({
        "event_id": event.id,
        "file_uuid": upload.uuid,
        "filename": &upload.filename,
        "replaced_file_id": previous,
        "summary": format!("Custom book of abstracts uploaded for event {}", event.id),
    });
    let _ = crate::audit::log(&pool, user_id, "boa.custom_uploaded", "event", event.id, details).await;
    log::info!(
        "Custom book of abstracts {} ({}) attached to event {}",
        upload.uuid,
        upload.filename,
        event.id
    );

    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------------------------------------------------
// DELETE: remove custom BOA
// ---------------------------------------------------------------------------

/// DELETE /event/{event_id}/manage/abstracts/boa/custom
pub async fn delete_custom_boa(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    storage: web::Data<LocalFileStorage>,
    session: Session,
    event: web::ReqData<Event>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf_header(&session, &req)?;
    let user_id = require_user_id(&session)?;

    let mut tx = pool.begin().await?;
    let Some(file_id) = event::lock_custom_boa(&mut *tx, event.id).await? else {
        return Ok(HttpResponse::NoContent().finish());
    };
    event::set_custom_boa(&mut *tx, event.id, None).await?;
    let key = file::delete(&mut *tx, file_id).await?;
    tx.commit().await?;

    if let Some(key) = key {
        remove_content(&storage, &key).await;
    }

    let details = serde_json::json!({
        "event_id": event.id,
        "file_id": file_id,
        "summary": format!("Custom book of abstracts removed from event {}", event.id),
    });
    let _ = crate::audit::log(&pool, user_id, "boa.custom_deleted", "event", event.id, details).await;
    log::info!("Custom book of abstracts removed from event {}", event.id);

    Ok(HttpResponse::NoContent().finish())
}

/// An upload may become the custom BOA of `event_id` only if it is a PDF that
/// was uploaded for that event's BOA.
pub fn check_boa_upload(upload: &StoredFile, event_id: i64) -> Result<(), AppError> {
    if upload.extension().as_deref() != Some(".pdf") {
        return Err(AppError::Validation(NOT_A_PDF_MESSAGE.to_string()));
    }
    if upload.context() != boa_context(event_id) {
        return Err(AppError::Validation(
            "The file was not uploaded for this book of abstracts.".to_string(),
        ));
    }
    Ok(())
}

async fn remove_content(storage: &LocalFileStorage, key: &str) {
    if let Err(e) = storage.delete(key).await {
        log::warn!("Could not remove stored file {key}: {e}");
    }
}
