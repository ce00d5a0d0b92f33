/// Book of abstracts downloads: the public PDF and the managers' TeX archive.

use actix_files::NamedFile;
use actix_session::Session;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{mime, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::access;
use crate::boa::{self, PDF_FILE_NAME, ZIP_FILE_NAME};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::event::Event;
use crate::models::file;
use crate::storage::LocalFileStorage;

#[derive(Deserialize)]
pub struct ExportQuery {
    pub latex: Option<String>,
}

impl ExportQuery {
    fn latex_requested(&self) -> bool {
        self.latex.as_deref() == Some("1")
    }
}

/// Which document answers a PDF download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoaSource {
    Generated,
    Custom(i64),
    Unavailable,
}

/// Managers may force the generated book with `?latex=1` to preview it while
/// a custom PDF is published.
pub fn choose_source(
    latex_requested: bool,
    latex_enabled: bool,
    can_manage: bool,
    custom_boa_id: Option<i64>,
) -> BoaSource {
    if latex_requested && latex_enabled && can_manage {
        return BoaSource::Generated;
    }
    match custom_boa_id {
        Some(id) => BoaSource::Custom(id),
        None if latex_enabled => BoaSource::Generated,
        None => BoaSource::Unavailable,
    }
}

// ---------------------------------------------------------------------------
// GET: PDF
// ---------------------------------------------------------------------------

/// GET /event/{event_id}/book-of-abstracts.pdf
pub async fn export_boa(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    storage: web::Data<LocalFileStorage>,
    session: Session,
    event: web::ReqData<Event>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    let latex_requested = query.latex_requested();
    let can_manage = latex_requested && access::can_manage_event(&pool, &session, event.id).await?;

    match choose_source(latex_requested, config.latex_enabled, can_manage, event.custom_boa_id) {
        BoaSource::Generated => {
            let path = boa::create_boa(&pool, &config, &event).await?;
            let pdf = NamedFile::open_async(&path)
                .await?
                .set_content_type(mime::APPLICATION_PDF)
                .set_content_disposition(disposition(DispositionType::Inline, PDF_FILE_NAME));
            Ok(pdf.into_response(&req))
        }
        BoaSource::Custom(file_id) => {
            let stored = file::find_by_id(pool.get_ref(), file_id)
                .await?
                .ok_or(AppError::NotFound)?;
            let path = storage.path(&stored.storage_key)?;
            let pdf = NamedFile::open_async(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    log::error!("Custom book of abstracts of event {} is missing from storage", event.id);
                }
                AppError::from(e)
            })?;
            Ok(pdf
                .set_content_type(mime::APPLICATION_PDF)
                .set_content_disposition(disposition(DispositionType::Inline, &stored.filename))
                .into_response(&req))
        }
        BoaSource::Unavailable => Err(AppError::NotFound),
    }
}

// ---------------------------------------------------------------------------
// GET: TeX sources
// ---------------------------------------------------------------------------

/// GET /event/{event_id}/manage/abstracts/boa.zip
pub async fn export_boa_tex(
    pool: web::Data<PgPool>,
    event: web::ReqData<Event>,
) -> Result<HttpResponse, AppError> {
    let archive = boa::create_boa_tex(&pool, &event).await?;
    log::debug!("Built TeX archive for event {} ({} bytes)", event.id, archive.len());
    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(disposition(DispositionType::Attachment, ZIP_FILE_NAME))
        .body(archive))
}

fn disposition(kind: DispositionType, filename: &str) -> ContentDisposition {
    ContentDisposition {
        disposition: kind,
        parameters: vec![DispositionParam::Filename(filename.to_string())],
    }
}
