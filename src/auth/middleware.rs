use actix_session::SessionExt;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};
use sqlx::PgPool;

use crate::auth::access;
use crate::errors::AppError;
use crate::models::{contribution, event::{self, Event}};

/// Redirects to /login when the session has no user.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();
    let has_user = session.get::<i64>("user_id").unwrap_or(None).is_some();

    if !has_user {
        let response = HttpResponse::SeeOther()
            .insert_header(("Location", "/login"))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Loads `{event_id}` and requires management rights on it. The event is
/// made available to handlers as `web::ReqData<Event>`.
pub async fn require_event_manager(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let event = match managed_event(&req).await {
        Ok(event) => event,
        Err(err) => return Ok(reject(req, err)),
    };
    req.extensions_mut().insert(event);
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Loads `{event_id}` and requires that the caller may view it.
pub async fn require_event_access(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let event = match visible_event(&req).await {
        Ok(event) => event,
        Err(err) => return Ok(reject(req, err)),
    };
    req.extensions_mut().insert(event);
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// 404 unless the event's contributions are published. Must run inside
/// `require_event_access`.
pub async fn require_contributions_published(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if let Err(err) = check_published(&req).await {
        return Ok(reject(req, err));
    }
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Answers the request with the error's own response instead of handing
/// an `Err` up the service chain.
fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    req.into_response(err.error_response()).map_into_right_body()
}

async fn managed_event(req: &ServiceRequest) -> Result<Event, AppError> {
    let (pool, event) = load_event(req).await?;
    let session = req.get_session();
    if !access::can_manage_event(&pool, &session, event.id).await? {
        return Err(AppError::PermissionDenied(format!("event.manage:{}", event.id)));
    }
    Ok(event)
}

async fn visible_event(req: &ServiceRequest) -> Result<Event, AppError> {
    let (pool, event) = load_event(req).await?;
    let session = req.get_session();
    if !access::can_access_event(&pool, &session, &event).await? {
        return Err(AppError::PermissionDenied(format!("event.view:{}", event.id)));
    }
    Ok(event)
}

async fn check_published(req: &ServiceRequest) -> Result<(), AppError> {
    let event_id = req
        .extensions()
        .get::<Event>()
        .map(|e| e.id)
        .ok_or(AppError::NotFound)?;
    let pool = pool_of(req)?;
    if !contribution::is_published(&pool, event_id).await? {
        return Err(AppError::NotPublished);
    }
    Ok(())
}

fn pool_of(req: &ServiceRequest) -> Result<web::Data<PgPool>, AppError> {
    req.app_data::<web::Data<PgPool>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("database pool not registered".to_string()))
}

async fn load_event(req: &ServiceRequest) -> Result<(web::Data<PgPool>, Event), AppError> {
    let pool = pool_of(req)?;
    let event_id = req
        .match_info()
        .get("event_id")
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or(AppError::NotFound)?;
    let event = event::find_by_id(&pool, event_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((pool, event))
}
