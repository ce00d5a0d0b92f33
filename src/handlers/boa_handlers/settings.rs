/// Book of abstracts settings dialog.
///
/// Both endpoints answer with JSON so the management page can swap the form
/// fragment in place or close the dialog and flash a message.

use actix_session::Session;
use actix_web::{web, HttpResponse};
use askama::Template;
use sqlx::PgPool;

use crate::auth::csrf;
use crate::auth::session::require_user_id;
use crate::boa;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::boa_settings;
use crate::models::event::Event;
use crate::templates_structs::BoaSettingsFormTemplate;

use super::forms::{BoaSettingsForm, FieldErrors};

pub const SAVED_MESSAGE: &str = "Book of Abstract settings have been saved";

pub const CUSTOM_BOA_MESSAGE: &str = "A custom book of abstracts has been uploaded. \
    These settings only affect the LaTeX-generated book, not the uploaded PDF.";

// ---------------------------------------------------------------------------
// GET: settings form
// ---------------------------------------------------------------------------

/// GET /event/{event_id}/manage/abstracts/boa/settings
pub async fn settings_form(
    pool: web::Data<PgPool>,
    session: Session,
    event: web::ReqData<Event>,
) -> Result<HttpResponse, AppError> {
    let settings = boa_settings::get_all(&pool, event.id).await?;
    let form = BoaSettingsForm::from_settings(&settings);
    form_response(&session, &event, form, FieldErrors::default())
}

// ---------------------------------------------------------------------------
// POST: save settings
// ---------------------------------------------------------------------------

/// POST /event/{event_id}/manage/abstracts/boa/settings
///
/// Invalid input is answered with the form and its errors; nothing is stored.
pub async fn save_settings(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
    event: web::ReqData<Event>,
    form: web::Form<BoaSettingsForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let user_id = require_user_id(&session)?;
    let form = form.into_inner();

    let settings = match form.validate() {
        Ok(settings) => settings,
        Err(errors) => return form_response(&session, &event, form, errors),
    };

    boa_settings::set_multi(&pool, event.id, &settings).await?;
    boa::clear_boa_cache(&pool, &config, event.id).await?;

    let details = serde_json::json!({
        "event_id": event.id,
        "sort_by": settings.sort_by.as_str(),
        "corresponding_author": settings.corresponding_author.as_str(),
        "min_lines_per_abstract": settings.min_lines_per_abstract,
        "show_abstract_ids": settings.show_abstract_ids,
        "summary": format!("Book of abstracts settings changed for event {}", event.id),
    });
    let _ = crate::audit::log(&pool, user_id, "boa.settings_saved", "event", event.id, details).await;
    log::info!("Book of abstracts settings saved for event {} by user {user_id}", event.id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "flash": SAVED_MESSAGE,
    })))
}

fn form_response(
    session: &Session,
    event: &Event,
    form: BoaSettingsForm,
    errors: FieldErrors,
) -> Result<HttpResponse, AppError> {
    let action = format!("/event/{}/manage/abstracts/boa/settings", event.id);
    let csrf_token = csrf::get_or_create_token(session);
    let error_json = (!errors.is_empty()).then(|| serde_json::to_value(&errors)).transpose()
        .map_err(|e| AppError::Internal(format!("Failed to serialize form errors: {e}")))?;
    let html = BoaSettingsFormTemplate::new(action, csrf_token, form, errors).render()?;

    let mut body = serde_json::json!({
        "success": false,
        "html": html,
    });
    if let Some(errors) = error_json {
        body["errors"] = errors;
    }
    if event.has_custom_boa() {
        body["message"] = serde_json::Value::from(CUSTOM_BOA_MESSAGE);
    }
    Ok(HttpResponse::Ok().json(body))
}
