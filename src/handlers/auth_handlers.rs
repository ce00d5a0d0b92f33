use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::session::{get_user_id, sign_in, Permissions};
use crate::auth::{csrf, password};
use crate::errors::{AppError, render};
use crate::models::{permission, user};
use crate::templates_structs::LoginTemplate;

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
    #[serde(default)]
    pub next: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

pub async fn login_page(
    session: Session,
    query: web::Query<LoginQuery>,
) -> Result<HttpResponse, AppError> {
    let next = safe_next(query.next.as_deref());
    if get_user_id(&session).is_some() {
        return Ok(see_other(&next));
    }

    let csrf_token = csrf::get_or_create_token(&session);
    render(LoginTemplate { error: None, csrf_token, next })
}

pub async fn login_submit(
    pool: web::Data<PgPool>,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let next = safe_next(Some(&form.next));

    let found = user::find_by_username(&pool, form.username.trim()).await?;
    let authenticated = match &found {
        Some(u) => password::verify_password(&form.password, &u.password_hash)?,
        None => false,
    };

    match found {
        Some(u) if authenticated => {
            let perms = Permissions(permission::find_codes_by_user_id(&pool, u.id).await?);
            sign_in(&session, u.id, &u.username, &perms)?;
            log::info!("User {} signed in", u.username);
            Ok(see_other(&next))
        }
        _ => {
            log::info!("Failed sign-in attempt for {:?}", form.username);
            let csrf_token = csrf::get_or_create_token(&session);
            render(LoginTemplate {
                error: Some("Invalid username or password".to_string()),
                csrf_token,
                next,
            })
        }
    }
}

pub async fn logout(
    session: Session,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    session.purge();
    Ok(see_other("/login"))
}

/// Only same-site absolute paths are followed after sign-in.
fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location))
        .finish()
}
