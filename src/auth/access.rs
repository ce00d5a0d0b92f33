//! Event-level capability checks.
//!
//! Global `event.manage_all` grants every event; otherwise the user must be
//! listed in `event_managers`.

use actix_session::Session;
use sqlx::PgPool;

use crate::auth::session::{get_permissions, get_user_id};
use crate::errors::AppError;
use crate::models::{event, permission};

pub async fn can_manage_event(pool: &PgPool, session: &Session, event_id: i64) -> Result<bool, AppError> {
    let Some(user_id) = get_user_id(session) else {
        return Ok(false);
    };
    if get_permissions(session).has(permission::MANAGE_ALL_EVENTS) {
        return Ok(true);
    }
    Ok(event::is_manager(pool, event_id, user_id).await?)
}

/// Protected events are only visible to their managers.
pub async fn can_access_event(
    pool: &PgPool,
    session: &Session,
    event: &event::Event,
) -> Result<bool, AppError> {
    if !event.is_protected {
        return Ok(true);
    }
    can_manage_event(pool, session, event.id).await
}
